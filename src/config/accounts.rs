//! User and group name lookup in `/etc/passwd`-style account files.

use std::path::Path;
use tracing::{debug, warn};

/// Default user database.
pub const PASSWD_FILE: &str = "/etc/passwd";

/// Default group database.
pub const GROUP_FILE: &str = "/etc/group";

/// Id of `name` in account-file text (`name:x:id:...`). Numeric names are
/// taken as ids.
pub fn find_id(content: &str, name: &str) -> Option<u32> {
    if let Ok(id) = name.parse::<u32>() {
        return Some(id);
    }
    content
        .lines()
        .filter(|line| !line.starts_with('#'))
        .find_map(|line| {
            let mut fields = line.split(':');
            if fields.next()? != name {
                return None;
            }
            fields.nth(1)?.trim().parse().ok()
        })
}

/// Look up `name` in the account file at `db`.
pub fn lookup_id(db: &Path, name: &str) -> Option<u32> {
    if name.is_empty() {
        return None;
    }
    let content = match std::fs::read_to_string(db) {
        Ok(content) => content,
        Err(e) => {
            debug!(path = %db.display(), error = %e, "Account file not readable");
            return name.parse().ok();
        }
    };
    let id = find_id(&content, name);
    if id.is_none() {
        warn!(path = %db.display(), name, "No such account, ownership not changed");
    }
    id
}
