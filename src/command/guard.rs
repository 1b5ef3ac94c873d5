use poise::serenity_prelude::RoleId;

/// Everything the moderation predicate looks at.
#[derive(Debug, Clone, Default)]
pub struct Invoker {
    pub administrator: bool,
    pub roles: Vec<RoleId>,
}

pub struct ModerationPolicy {
    role: Option<RoleId>,
}

impl ModerationPolicy {
    pub fn new(role: Option<RoleId>) -> Self {
        Self { role }
    }

    /// Without a configured role every invoker passes.
    pub fn permits(&self, invoker: &Invoker) -> bool {
        match self.role {
            None => true,
            Some(role) => invoker.administrator || invoker.roles.contains(&role),
        }
    }
}

pub fn requires_moderation(command: &str) -> bool {
    command != "ping"
}

/// Whether the handler of `command` may run for `invoker`.
pub fn check_passes(command: &str, policy: &ModerationPolicy, invoker: &Invoker) -> bool {
    !requires_moderation(command) || policy.permits(invoker)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(roles: &[u64]) -> Invoker {
        Invoker {
            administrator: false,
            roles: roles.iter().map(|id| RoleId::new(*id)).collect(),
        }
    }

    #[test]
    fn open_door_without_role() {
        let policy = ModerationPolicy::new(None);
        assert!(policy.permits(&member(&[])));
    }

    #[test]
    fn moderator_role_passes() {
        let policy = ModerationPolicy::new(Some(RoleId::new(5)));
        assert!(policy.permits(&member(&[3, 5])));
        assert!(!policy.permits(&member(&[3])));
    }

    #[test]
    fn administrator_passes_without_role() {
        let policy = ModerationPolicy::new(Some(RoleId::new(5)));
        let admin = Invoker { administrator: true, roles: vec![] };
        assert!(policy.permits(&admin));
    }

    #[test]
    fn ping_passes_for_everyone() {
        let policy = ModerationPolicy::new(Some(RoleId::new(5)));
        assert!(check_passes("ping", &policy, &member(&[])));
    }

    #[test]
    fn non_moderator_fails_every_other_command() {
        let policy = ModerationPolicy::new(Some(RoleId::new(5)));
        for command in ["say", "purge", "help", "play", "stop", "announce-test"] {
            assert!(!check_passes(command, &policy, &member(&[3])));
            assert!(check_passes(command, &policy, &member(&[5])));
        }
    }

    #[test]
    fn only_ping_is_exempt() {
        assert!(!requires_moderation("ping"));
        for command in ["say", "purge", "help", "play", "stop", "announce-test"] {
            assert!(requires_moderation(command));
        }
    }
}
