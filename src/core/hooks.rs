//! Deployment hooks configured in `config/stairstep.yml`.
//!
//! Each phase is an ordered map of platform command types to argument lists:
//!
//! ```yaml
//! before_deploy:
//!   run:
//!     - rake maintenance:announce
//! after_deploy:
//!   run:
//!     - rake cache:clear
//!     - rake search:reindex
//!   "config:set": DEPLOYED=1
//! ```
//!
//! Every argument becomes one `heroku <type> <argument>` invocation against
//! the target application, in file order.

use std::fmt;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;

/// A command type with the arguments it is invoked with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookEntry {
    pub command_type: String,
    pub arguments: Vec<String>,
}

/// Deployment phase a hook list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    BeforeDeploy,
    AfterDeploy,
}

impl HookPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookPhase::BeforeDeploy => "before_deploy",
            HookPhase::AfterDeploy => "after_deploy",
        }
    }
}

/// Flatten hook entries into `(command type, argument)` pairs, preserving order.
pub fn invocations(entries: &[HookEntry]) -> Vec<(&str, &str)> {
    entries
        .iter()
        .flat_map(|entry| {
            entry
                .arguments
                .iter()
                .map(move |arg| (entry.command_type.as_str(), arg.as_str()))
        })
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Arguments {
    One(String),
    Many(Vec<String>),
}

impl From<Arguments> for Vec<String> {
    fn from(arguments: Arguments) -> Self {
        match arguments {
            Arguments::One(arg) => vec![arg],
            Arguments::Many(args) => args,
        }
    }
}

/// Deserialize a hook map keeping the order entries appear in the source.
pub(crate) fn deserialize_hooks<'de, D>(deserializer: D) -> Result<Vec<HookEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    struct HookMapVisitor;

    impl<'de> Visitor<'de> for HookMapVisitor {
        type Value = Vec<HookEntry>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of command types to argument lists")
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Vec::new())
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut entries = Vec::new();
            while let Some((command_type, arguments)) = map.next_entry::<String, Arguments>()? {
                entries.push(HookEntry {
                    command_type,
                    arguments: arguments.into(),
                });
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_any(HookMapVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        #[serde(default, deserialize_with = "deserialize_hooks")]
        hooks: Vec<HookEntry>,
    }

    fn parse(yaml: &str) -> Vec<HookEntry> {
        serde_yml::from_str::<Wrapper>(yaml).unwrap().hooks
    }

    #[test]
    fn entries_keep_file_order() {
        let hooks = parse(
            "hooks:\n  run:\n    - rake cache:clear\n    - rake search:reindex\n  \"config:set\": DEPLOYED=1\n",
        );

        assert_eq!(
            invocations(&hooks),
            vec![
                ("run", "rake cache:clear"),
                ("run", "rake search:reindex"),
                ("config:set", "DEPLOYED=1"),
            ]
        );
    }

    #[test]
    fn empty_phase_has_no_invocations() {
        assert!(parse("hooks:\n").is_empty());
        assert!(parse("{}").is_empty());
    }

    #[test]
    fn phase_names_match_config_keys() {
        assert_eq!(HookPhase::BeforeDeploy.as_str(), "before_deploy");
        assert_eq!(HookPhase::AfterDeploy.as_str(), "after_deploy");
    }
}
