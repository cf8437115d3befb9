use super::{ProfileVersionHistory, RevisionTarget};
use crate::modules::device::generate_profile;
use agswitch_types::error::{ErrorCategory, ProfileError};
use agswitch_types::models::Account;
use rand::Rng;

fn account() -> Account {
    Account::new("acc-1".to_string(), "Test".to_string(), "test@example.com".to_string())
}

fn current_count(account: &Account) -> usize {
    account.device_history.iter().filter(|v| v.is_current).count()
}

#[test]
fn test_parse_sentinels() {
    assert_eq!(RevisionTarget::parse("baseline"), RevisionTarget::Baseline);
    assert_eq!(RevisionTarget::parse("current"), RevisionTarget::Current);
    assert_eq!(RevisionTarget::parse("abc"), RevisionTarget::Version("abc".to_string()));
}

#[test]
fn test_bind_with_history_demotes_previous() {
    let mut acc = account();
    let first = generate_profile();
    let second = generate_profile();

    acc.bind_profile(first, "generate", true);
    acc.bind_profile(second.clone(), "capture", true);

    assert_eq!(acc.device_history.len(), 2);
    assert_eq!(current_count(&acc), 1);
    assert!(acc.device_history[1].is_current);
    assert_eq!(acc.device_history[1].label, "capture");
    assert_eq!(acc.device_profile, Some(second));
}

#[test]
fn test_bind_without_history_only_sets_profile() {
    let mut acc = account();
    let profile = generate_profile();

    assert!(acc.bind_profile(profile.clone(), "generate", false).is_none());
    assert!(acc.device_history.is_empty());
    assert_eq!(acc.device_profile, Some(profile));
}

#[test]
fn test_restore_baseline_requires_baseline() {
    let mut acc = account();
    let err = acc.restore_revision("baseline", None).unwrap_err();
    assert_eq!(err, ProfileError::BaselineNotFound);
    assert_eq!(err.category(), ErrorCategory::NotFound);
}

#[test]
fn test_restore_baseline_demotes_all_versions() {
    let mut acc = account();
    let baseline = generate_profile();
    acc.bind_profile(generate_profile(), "generate", true);

    let restored = acc.restore_revision("baseline", Some(&baseline)).unwrap();

    assert_eq!(restored, baseline);
    assert_eq!(acc.device_profile, Some(baseline));
    assert_eq!(current_count(&acc), 0);
}

#[test]
fn test_restore_current_requires_bound_profile() {
    let mut acc = account();
    assert_eq!(acc.restore_revision("current", None).unwrap_err(), ProfileError::NoBoundProfile);

    let profile = generate_profile();
    acc.bind_profile(profile.clone(), "generate", false);
    assert_eq!(acc.restore_revision("current", None).unwrap(), profile);
}

#[test]
fn test_restore_version_marks_it_current() {
    let mut acc = account();
    let old = generate_profile();
    acc.bind_profile(old.clone(), "generate", true);
    let old_id = acc.device_history[0].id.clone();
    acc.bind_profile(generate_profile(), "generate", true);

    let restored = acc.restore_revision(&old_id, None).unwrap();

    assert_eq!(restored, old);
    assert!(acc.device_history[0].is_current);
    assert!(!acc.device_history[1].is_current);
    assert_eq!(acc.device_profile, Some(old));
}

#[test]
fn test_restore_unknown_version_is_not_found() {
    let mut acc = account();
    acc.bind_profile(generate_profile(), "generate", true);
    let before = acc.clone();

    let err = acc.restore_revision("nope", None).unwrap_err();
    assert_eq!(err, ProfileError::VersionNotFound { id: "nope".to_string() });
    assert_eq!(acc, before);
}

#[test]
fn test_delete_rejects_baseline_and_current() {
    let mut acc = account();
    acc.bind_profile(generate_profile(), "generate", true);
    let current_id = acc.device_history[0].id.clone();

    let err = acc.delete_revision("baseline").unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InvalidState);

    let err = acc.delete_revision(&current_id).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InvalidState);
    assert_eq!(acc.device_history.len(), 1);
}

#[test]
fn test_delete_removes_old_version() {
    let mut acc = account();
    acc.bind_profile(generate_profile(), "generate", true);
    let old_id = acc.device_history[0].id.clone();
    acc.bind_profile(generate_profile(), "generate", true);

    let removed = acc.delete_revision(&old_id).unwrap();
    assert_eq!(removed.id, old_id);
    assert_eq!(acc.device_history.len(), 1);
    assert!(acc.device_history[0].is_current);

    assert_eq!(
        acc.delete_revision(&old_id).unwrap_err(),
        ProfileError::VersionNotFound { id: old_id }
    );
}

/// Random operation sequences never leave more than one current version,
/// and a recorded bind always leaves exactly one.
#[test]
fn test_random_operations_keep_single_current() {
    let mut rng = rand::thread_rng();
    let baseline = generate_profile();

    for _ in 0..50 {
        let mut acc = account();
        for _ in 0..40 {
            let pick_id = |acc: &Account, rng: &mut rand::rngs::ThreadRng| -> String {
                if acc.device_history.is_empty() || rng.gen_bool(0.1) {
                    ["baseline", "current", "missing"][rng.gen_range(0..3)].to_string()
                } else {
                    acc.device_history[rng.gen_range(0..acc.device_history.len())].id.clone()
                }
            };

            match rng.gen_range(0..4) {
                0 => {
                    acc.bind_profile(generate_profile(), "generate", true);
                    assert_eq!(current_count(&acc), 1);
                },
                1 => {
                    acc.bind_profile(generate_profile(), "generate", false);
                },
                2 => {
                    let id = pick_id(&acc, &mut rng);
                    let _ = acc.restore_revision(&id, Some(&baseline));
                },
                _ => {
                    let id = pick_id(&acc, &mut rng);
                    let _ = acc.delete_revision(&id);
                },
            }
            assert!(current_count(&acc) <= 1);
        }
    }
}
