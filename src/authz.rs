// ABOUTME: Authorization resolver: principals and visible environments from grants (§4.6)
// ABOUTME: Pure functions over a snapshot the Store hands in; no caching

use std::collections::BTreeSet;

use crate::model::{Environment, Role};

/// Compute the environments visible to a user, given their role, granted
/// project names, and the full environment list. Admins see everything;
/// everyone else sees only environments whose project they were granted.
#[must_use]
pub fn visible_environments<'a>(
    role: Role,
    granted_projects: &[String],
    all_environments: &'a [Environment],
) -> Vec<&'a Environment> {
    if role == Role::Admin {
        return all_environments.iter().collect();
    }
    let granted: BTreeSet<&str> = granted_projects.iter().map(String::as_str).collect();
    all_environments
        .iter()
        .filter(|env| granted.contains(env.project_name.as_str()))
        .collect()
}

/// Compute the certificate principals for a user: the unique `deploy_user`
/// values across their visible environments, sorted alphabetically, with
/// the user's own name appended last as the self-principal.
///
/// A user with zero grants still gets a non-empty result: just the
/// self-principal. This is by design (§4.2, §8) and is not an error.
#[must_use]
pub fn resolve_principals(user_name: &str, visible_environments: &[&Environment]) -> Vec<String> {
    let mut deploy_users: BTreeSet<&str> = visible_environments
        .iter()
        .map(|env| env.deploy_user.as_str())
        .collect();
    deploy_users.remove(user_name);
    let mut principals: Vec<String> = deploy_users.into_iter().map(str::to_string).collect();
    principals.push(user_name.to_string());
    principals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(project: &str, deploy_user: &str) -> Environment {
        Environment {
            project_name: project.to_string(),
            name: "stg".to_string(),
            host: "host".to_string(),
            port: 22,
            deploy_user: deploy_user.to_string(),
            deploy_key: String::new(),
        }
    }

    #[test]
    fn admin_sees_all_environments() {
        let envs = vec![env("a", "deploy"), env("b", "deploy")];
        let visible = visible_environments(Role::Admin, &[], &envs);
        assert_eq!(visible.len(), 2);
    }

    #[test]
    fn dev_sees_only_granted_projects() {
        let envs = vec![env("a", "deploy"), env("b", "deploy")];
        let visible = visible_environments(Role::Dev, &["a".to_string()], &envs);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].project_name, "a");
    }

    #[test]
    fn zero_grants_still_yields_self_principal() {
        let principals = resolve_principals("dev1", &[]);
        assert_eq!(principals, vec!["dev1".to_string()]);
    }

    #[test]
    fn principals_are_deduped_and_sorted_with_self_last() {
        let envs = vec![env("a", "deploy"), env("b", "deploy"), env("c", "admin")];
        let refs: Vec<&Environment> = envs.iter().collect();
        let principals = resolve_principals("dev1", &refs);
        assert_eq!(principals, vec!["admin".to_string(), "deploy".to_string(), "dev1".to_string()]);
    }

    #[test]
    fn self_name_colliding_with_a_deploy_user_is_not_duplicated() {
        let envs = vec![env("a", "dev1")];
        let refs: Vec<&Environment> = envs.iter().collect();
        let principals = resolve_principals("dev1", &refs);
        assert_eq!(principals, vec!["dev1".to_string()]);
    }
}
