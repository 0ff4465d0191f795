//! ID utilities (ULIDs for turn actions and toasts).

use ulid::Ulid;

/// Generate a short id for one turn action, recorded on its tracing span.
pub fn new_action_id() -> String {
    let ulid = Ulid::new().to_string();
    // the random tail is enough to tell concurrent actions apart in logs
    ulid.chars().skip(16).collect()
}

/// Full ULID used to match a toast with its dismissal.
pub fn new_toast_id() -> Ulid {
    Ulid::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_ids_are_short_and_distinct() {
        let a = new_action_id();
        let b = new_action_id();
        assert_eq!(a.len(), 10);
        assert_ne!(a, b);
    }
}
