//! Property-based tests for canonical identity resolution.
//!
//! These tests use proptest to generate random hosts and repository paths
//! and verify that the different URL spellings of one remote agree.

#[cfg(test)]
mod proptest_tests {
    use crate::identity::{resolve, CanonicalIdentity};
    use proptest::prelude::*;

    fn host() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9]{0,10}(\\.[a-z][a-z0-9]{0,10}){1,3}"
    }

    fn repo_path() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9_-]{0,8}(/[a-z][a-z0-9_-]{0,8}){0,3}"
    }

    // ============================================================================
    // resolve property tests
    // ============================================================================

    proptest! {
        /// Property: SSH, scp-like and HTTPS spellings of a remote resolve identically
        #[test]
        fn ssh_and_scheme_forms_resolve_identically(host in host(), path in repo_path()) {
            let ssh = resolve(&format!("ssh://{}:29418/{}.git", host, path), None).unwrap();
            let scp = resolve(&format!("git@{}:{}", host, path), None).unwrap();
            let https = resolve(&format!("https://{}/{}.git", host, path), None).unwrap();

            prop_assert_eq!(&ssh, &scp);
            prop_assert_eq!(&ssh, &https);
            prop_assert_eq!(ssh.to_string(), format!("{}/{}", host, path));
        }

        /// Property: resolve is deterministic (same input = same output)
        #[test]
        fn resolve_is_deterministic(host in host(), path in repo_path()) {
            let url = format!("https://{}/{}", host, path);
            prop_assert_eq!(resolve(&url, None).unwrap(), resolve(&url, None).unwrap());
        }

        /// Property: resolving the SSH form of an identity yields the identity back
        #[test]
        fn ssh_url_round_trips(host in host(), path in repo_path()) {
            let identity = CanonicalIdentity::new(&host, &path);
            prop_assert_eq!(resolve(&identity.ssh_url(), None).unwrap(), identity);
        }

        /// Property: resolved names never carry leading slashes, empty segments or `.git`
        #[test]
        fn resolved_names_are_normalized(host in host(), path in repo_path(), slashes in 1usize..4) {
            let sep = "/".repeat(slashes);
            let url = format!("https://{}{}{}.git", host, sep, path.replace('/', &sep));
            let identity = resolve(&url, None).unwrap();

            prop_assert!(!identity.name().starts_with('/'));
            prop_assert!(!identity.name().contains("//"));
            prop_assert!(!identity.name().ends_with(".git"));
        }

        /// Property: `../<leaf>` is a sibling of the containing repository
        #[test]
        fn relative_sibling_shares_parent(host in host(), parent in repo_path(), leaf in "[a-z]{1,8}") {
            let base = CanonicalIdentity::new(&host, &format!("{}/top", parent));
            let resolved = resolve(&format!("../{}", leaf), Some(&base)).unwrap();
            prop_assert_eq!(resolved.name(), format!("{}/{}", parent, leaf));
            prop_assert_eq!(resolved.hostname(), base.hostname());
        }
    }
}
