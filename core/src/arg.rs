//! Positional argument definitions and binding.

use crate::binding::Binding;
use crate::error::{ArgError, ErrorList};

/// Declarative description of one positional argument.
///
/// Order is significant: the n-th definition of a command receives the n-th
/// positional token.
///
/// # Examples
///
/// ```
/// use cmdtree_core::{ArgDef, Binding};
///
/// let src = Binding::new(String::new());
/// let arg = ArgDef::required("source", src.clone()).with_usage("File to copy");
/// assert!(arg.required);
/// ```
#[derive(Debug, Clone)]
pub struct ArgDef {
    pub name: String,
    pub usage: String,
    pub required: bool,
    /// Value written when the token is absent
    pub default: Option<String>,
    pub target: Option<Binding<String>>,
    /// Sample value used when generating examples
    pub example: Option<String>,
}

impl ArgDef {
    pub fn required(name: &str, target: Binding<String>) -> Self {
        Self {
            name: name.to_string(),
            usage: String::new(),
            required: true,
            default: None,
            target: Some(target),
            example: None,
        }
    }

    pub fn optional(name: &str, target: Binding<String>) -> Self {
        Self {
            required: false,
            ..Self::required(name, target)
        }
    }

    pub fn with_usage(mut self, usage: &str) -> Self {
        self.usage = usage.to_string();
        self
    }

    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }

    pub fn with_example(mut self, example: &str) -> Self {
        self.example = Some(example.to_string());
        self
    }
}

/// Binds `tokens` to `defs` in declared order.
///
/// Fails immediately with [`ArgError::TooFew`] when fewer tokens remain than
/// there are required arguments. Otherwise every available token is bound,
/// absent optional arguments receive their default, and each absent required
/// argument adds an [`ArgError::Missing`]. Surplus tokens are ignored.
pub fn assign_args(defs: &[ArgDef], tokens: &[String]) -> Result<(), ErrorList<ArgError>> {
    let required = defs.iter().filter(|d| d.required).count();
    if tokens.len() < required {
        return Err(ErrorList::from_iter([ArgError::TooFew {
            expected: required,
            got: tokens.len(),
        }]));
    }

    let mut errors = ErrorList::new();
    for (i, def) in defs.iter().enumerate() {
        let value = match tokens.get(i) {
            Some(token) => token.clone(),
            None if def.required => {
                errors.push(ArgError::Missing {
                    name: def.name.clone(),
                });
                continue;
            }
            None => match &def.default {
                Some(default) => default.clone(),
                None => continue,
            },
        };
        if let Some(target) = &def.target {
            target.set(value);
        }
    }

    errors.into_result()
}
