use crate::Id;
use std::collections::{HashMap, HashSet};

/// Simple HashMap-based name generator that hands out unique names within
/// one scope. The first request for a name returns it unchanged; later
/// requests get `_1`, `_2`, ... appended.
#[derive(Clone, Debug, Default)]
pub struct NameGenerator {
    /// Last suffix handed out for each base name.
    name_hash: HashMap<Id, u64>,
    generated_names: HashSet<Id>,
}

impl NameGenerator {
    /// Create a NameGenerator where `names` are already defined so that this generator
    /// will never generate those names.
    pub fn with_prev_defined_names(names: HashSet<Id>) -> Self {
        NameGenerator {
            generated_names: names,
            name_hash: HashMap::default(),
        }
    }

    /// Add generated names
    pub fn add_names(&mut self, names: HashSet<Id>) {
        self.generated_names.extend(names)
    }

    /// Returns true if `name` has been handed out or reserved.
    pub fn contains<S: Into<Id>>(&self, name: S) -> bool {
        self.generated_names.contains(&name.into())
    }

    /// Returns a name that starts with `base` and was never returned before.
    /// For example:
    /// ```
    /// # use modgen_utils::NameGenerator;
    /// let mut namegen = NameGenerator::default();
    /// assert_eq!(namegen.uniquify("inst"), "inst");
    /// assert_eq!(namegen.uniquify("inst"), "inst_1");
    /// assert_eq!(namegen.uniquify("inst"), "inst_2");
    /// ```
    pub fn uniquify<S>(&mut self, base: S) -> Id
    where
        S: Into<Id>,
    {
        let base: Id = base.into();
        if self.generated_names.insert(base) {
            return base;
        }
        // Every `base_k` below the recorded counter is already taken, so the
        // search resumes from there.
        let ctr = self.name_hash.entry(base).or_insert(0);
        loop {
            *ctr += 1;
            let name = Id::from(format!("{base}_{ctr}"));
            if self.generated_names.insert(name) {
                return name;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::NameGenerator;
    use crate::Id;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn skips_previously_defined_names() {
        let prev: HashSet<Id> =
            ["x", "x_1", "x_3"].into_iter().map(Id::from).collect();
        let mut namegen = NameGenerator::with_prev_defined_names(prev);
        assert_eq!(namegen.uniquify("x"), "x_2");
        assert_eq!(namegen.uniquify("x"), "x_4");
        assert_eq!(namegen.uniquify("y"), "y");
    }

    #[test]
    fn suffixed_request_does_not_collide() {
        let mut namegen = NameGenerator::default();
        assert_eq!(namegen.uniquify("a"), "a");
        assert_eq!(namegen.uniquify("a_1"), "a_1");
        assert_eq!(namegen.uniquify("a"), "a_2");
        assert_eq!(namegen.uniquify("a_1"), "a_1_1");
    }

    proptest! {
        #[test]
        fn never_returns_a_name_twice(
            requests in prop::collection::vec("[ab](_[12])?", 1..64)
        ) {
            let mut namegen = NameGenerator::default();
            let mut seen = HashSet::new();
            for req in &requests {
                let name = namegen.uniquify(req.as_str());
                prop_assert!(name.as_str().starts_with(req.as_str()));
                prop_assert!(seen.insert(name));
            }
        }

        #[test]
        fn first_request_is_unmodified(base in "[a-z]{1,8}") {
            let mut namegen = NameGenerator::default();
            prop_assert_eq!(namegen.uniquify(base.as_str()), Id::from(&base));
        }
    }
}
