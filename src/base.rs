use serde::{Deserialize, Serialize};

use crate::error::DcecError;
use crate::namespace::Namespace;

const BASE_VOCABULARY: &str = include_str!("base.toml");
const BASE_SOURCE: &str = "<builtin base.toml>";

/// Loadable slices of the base vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseGroup {
    /// Sort hierarchy, modal operators, event calculus and core connectives.
    Dcec,
    Logic,
    Numerics,
    Sets,
}

impl BaseGroup {
    pub const ALL: [BaseGroup; 4] = [
        BaseGroup::Dcec,
        BaseGroup::Logic,
        BaseGroup::Numerics,
        BaseGroup::Sets,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BaseGroup::Dcec => "dcec",
            BaseGroup::Logic => "logic",
            BaseGroup::Numerics => "numerics",
            BaseGroup::Sets => "sets",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Vocabulary {
    dcec: GroupSpec,
    logic: GroupSpec,
    numerics: GroupSpec,
    sets: GroupSpec,
}

impl Vocabulary {
    fn group(&self, group: BaseGroup) -> &GroupSpec {
        match group {
            BaseGroup::Dcec => &self.dcec,
            BaseGroup::Logic => &self.logic,
            BaseGroup::Numerics => &self.numerics,
            BaseGroup::Sets => &self.sets,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, default)]
struct GroupSpec {
    sorts: Vec<SortSpec>,
    functions: Vec<FunctionSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SortSpec {
    name: String,
    #[serde(default)]
    parents: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FunctionSpec {
    name: String,
    returns: String,
    params: Vec<String>,
}

/// Registers the requested groups, in order, into `ns`.
///
/// Groups other than `dcec` name sorts declared by `dcec`; loading them
/// alone registers their signatures without the sort hierarchy.
pub fn load_groups(ns: &mut Namespace, groups: &[BaseGroup]) -> Result<(), DcecError> {
    let vocabulary: Vocabulary =
        toml::from_str(BASE_VOCABULARY).map_err(|err| DcecError::Config {
            path: BASE_SOURCE.to_string(),
            reason: err.to_string(),
        })?;

    for group in groups {
        let spec = vocabulary.group(*group);
        for sort in &spec.sorts {
            let parents: Vec<&str> = sort.parents.iter().map(String::as_str).collect();
            ns.register_sort(&sort.name, &parents)?;
        }
        for function in &spec.functions {
            let params: Vec<&str> = function.params.iter().map(String::as_str).collect();
            ns.register_function(&function.name, &function.returns, &params);
        }
        tracing::debug!(
            group = group.as_str(),
            sorts = spec.sorts.len(),
            functions = spec.functions.len(),
            "loaded base vocabulary group"
        );
    }
    Ok(())
}
