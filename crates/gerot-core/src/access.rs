use crate::Role;

/// The authenticated caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
    pub role: Role,
    pub sector_id: Option<i64>,
}

impl Actor {
    pub fn new(user_id: i64, role: Role, sector_id: Option<i64>) -> Self {
        Self {
            user_id,
            role,
            sector_id,
        }
    }

    fn in_sector(&self, sector_id: Option<i64>) -> bool {
        matches!((self.sector_id, sector_id), (Some(a), Some(b)) if a == b)
    }

    pub fn can_view_sector(&self, sector_id: i64) -> bool {
        self.role.is_admin() || self.sector_id == Some(sector_id)
    }

    /// Lideres manage colaboradores of their own sector only.
    pub fn can_manage_user(&self, target_role: Role, target_sector: Option<i64>) -> bool {
        match self.role {
            Role::AdminMaster => true,
            Role::Lider => self.role.can_manage(target_role) && self.in_sector(target_sector),
            Role::Colaborador => false,
        }
    }

    pub fn can_view_user_data(&self, owner_id: i64, owner_sector: Option<i64>) -> bool {
        if self.user_id == owner_id || self.role.is_admin() {
            return true;
        }
        self.role == Role::Lider && self.in_sector(owner_sector)
    }

    /// Sector the caller's listings are restricted to; `None` means every sector.
    pub fn sector_scope(&self) -> Option<i64> {
        if self.role.is_admin() {
            None
        } else {
            self.sector_id
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_sees_everything() {
        let admin = Actor::new(1, Role::AdminMaster, None);
        assert!(admin.can_view_sector(42));
        assert!(admin.can_manage_user(Role::Lider, Some(7)));
        assert!(admin.can_view_user_data(99, None));
        assert_eq!(admin.sector_scope(), None);
    }

    #[test]
    fn test_lider_scoped_to_sector() {
        let lider = Actor::new(2, Role::Lider, Some(3));
        assert!(lider.can_view_sector(3));
        assert!(!lider.can_view_sector(4));

        assert!(lider.can_manage_user(Role::Colaborador, Some(3)));
        assert!(!lider.can_manage_user(Role::Colaborador, Some(4)));
        assert!(!lider.can_manage_user(Role::Lider, Some(3)));
        assert!(!lider.can_manage_user(Role::Colaborador, None));

        assert!(lider.can_view_user_data(10, Some(3)));
        assert!(!lider.can_view_user_data(10, Some(5)));
        assert_eq!(lider.sector_scope(), Some(3));
    }

    #[test]
    fn test_colaborador_sees_only_self() {
        let colab = Actor::new(5, Role::Colaborador, Some(3));
        assert!(colab.can_view_user_data(5, Some(3)));
        assert!(!colab.can_view_user_data(6, Some(3)));
        assert!(!colab.can_manage_user(Role::Colaborador, Some(3)));
    }
}
