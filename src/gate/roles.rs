use crate::store::Role;
use std::fmt;

/// Allow-list of roles attached to a route. Membership is a bit test.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct RoleSet(u8);

impl RoleSet {
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn all() -> Self {
        Self::empty()
            .with(Role::Assistant)
            .with(Role::Organizer)
            .with(Role::Speaker)
            .with(Role::Admin)
    }

    #[must_use]
    pub const fn with(self, role: Role) -> Self {
        Self(self.0 | bit(role))
    }

    #[must_use]
    pub const fn contains(self, role: Role) -> bool {
        self.0 & bit(role) != 0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Role> {
        Role::ALL.into_iter().filter(move |role| self.contains(*role))
    }
}

const fn bit(role: Role) -> u8 {
    1 << role as u8
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

impl<const N: usize> From<[Role; N]> for RoleSet {
    fn from(roles: [Role; N]) -> Self {
        roles.into_iter().collect()
    }
}

impl From<Role> for RoleSet {
    fn from(role: Role) -> Self {
        Self::empty().with(role)
    }
}

impl fmt::Debug for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership() {
        let set = RoleSet::from([Role::Organizer, Role::Admin]);
        assert!(set.contains(Role::Organizer));
        assert!(set.contains(Role::Admin));
        assert!(!set.contains(Role::Assistant));
        assert!(!set.contains(Role::Speaker));
    }

    #[test]
    fn all_contains_every_role() {
        let all = RoleSet::all();
        assert!(Role::ALL.iter().all(|role| all.contains(*role)));
        assert_eq!(all.iter().count(), 4);
    }

    #[test]
    fn empty_contains_nothing() {
        assert!(RoleSet::empty().is_empty());
        assert!(Role::ALL.iter().all(|role| !RoleSet::empty().contains(*role)));
    }

    #[test]
    fn debug_lists_roles() {
        assert_eq!(
            format!("{:?}", RoleSet::from(Role::Admin)),
            "{Admin}"
        );
    }
}
