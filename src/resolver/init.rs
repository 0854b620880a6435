//! Init properties (`confluence-init.properties`).

use crate::artifact::Artifact;
use crate::fields::{Origin, Trace};
use std::path::Path;

pub const HOME_KEY: &str = "confluence.home";

pub(crate) fn build(home: &Path, trace: &mut Trace) -> Artifact {
    let home = trace.record(HOME_KEY, home.to_string_lossy(), Origin::Derived);
    Artifact::properties([(HOME_KEY.to_string(), home)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_line() {
        let art = build(Path::new("/tmp/"), &mut Trace::new());
        assert_eq!(art.render(), "confluence.home = /tmp/\n");
    }
}
