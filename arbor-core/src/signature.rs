//! Argument binding.
//!
//! A handler declares its parameters once, as an ordered list of
//! [`Parameter`]s. [`Signature::compile`] validates that list at
//! registration time and the resulting [`Signature`] binds request input
//! to it on every dispatch.
//!
//! Binding rules:
//!
//! - sticker parameters ignore request input and are created from the
//!   context;
//! - a positional parameter may also be supplied by keyword, but not both;
//! - coercion applies to supplied input only, never to defaults;
//! - keyword input matching no parameter is dropped unless a var-keyword
//!   parameter collects it;
//! - in [`BindMode::Terminal`] leftover positional input is a mismatch, in
//!   [`BindMode::Partial`] it is returned as the tail together with the
//!   number of items consumed.

use crate::{Context, Error, Input, Sticker, StickerSpec, Value};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Positional,
    KeywordOnly,
    VarPositional,
    VarKeyword,
}

impl ParamKind {
    fn rank(self) -> u8 {
        match self {
            ParamKind::Positional => 0,
            ParamKind::VarPositional => 1,
            ParamKind::KeywordOnly => 2,
            ParamKind::VarKeyword => 3,
        }
    }

    fn is_variadic(self) -> bool {
        matches!(self, ParamKind::VarPositional | ParamKind::VarKeyword)
    }
}

/// Scalar a parameter is coerced to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Str,
    Int,
    Float,
    Bool,
}

impl ScalarType {
    pub fn coerce(self, value: Value) -> Result<Value, String> {
        match (self, value) {
            (ScalarType::Str, Value::Str(s)) => Ok(Value::Str(s)),
            (ScalarType::Str, v @ (Value::Int(_) | Value::Float(_) | Value::Bool(_))) => {
                Ok(Value::Str(v.to_string()))
            }

            (ScalarType::Int, Value::Int(i)) => Ok(Value::Int(i)),
            (ScalarType::Int, Value::Str(s)) => s
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| format!("invalid int literal {s:?}")),
            (ScalarType::Int, Value::Float(x)) if x.is_finite() => Ok(Value::Int(x.trunc() as i64)),
            (ScalarType::Int, Value::Bool(b)) => Ok(Value::Int(i64::from(b))),

            (ScalarType::Float, Value::Float(x)) => Ok(Value::Float(x)),
            (ScalarType::Float, Value::Int(i)) => Ok(Value::Float(i as f64)),
            (ScalarType::Float, Value::Str(s)) => s
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| format!("invalid float literal {s:?}")),

            (ScalarType::Bool, Value::Bool(b)) => Ok(Value::Bool(b)),
            (ScalarType::Bool, Value::Int(i)) => Ok(Value::Bool(i != 0)),
            (ScalarType::Bool, Value::Str(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Value::Bool(true)),
                "false" | "0" | "no" | "off" => Ok(Value::Bool(false)),
                _ => Err(format!("invalid bool literal {s:?}")),
            },

            (ty, other) => Err(format!("cannot convert {} to {:?}", other.type_name(), ty)),
        }
    }
}

/// Custom conversion applied to supplied input.
pub type Converter = Arc<dyn Fn(Value) -> Result<Value, Error> + Send + Sync>;

/// How supplied input turns into the bound value.
#[derive(Clone)]
pub enum Binding {
    None,
    Coerce(ScalarType),
    Convert(Converter),
    Sticker(StickerSpec),
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::None => f.write_str("None"),
            Binding::Coerce(ty) => f.debug_tuple("Coerce").field(ty).finish(),
            Binding::Convert(_) => f.write_str("Convert(..)"),
            Binding::Sticker(spec) => f.debug_tuple("Sticker").field(spec).finish(),
        }
    }
}

/// One declared handler parameter.
#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    kind: ParamKind,
    default: Option<Value>,
    binding: Binding,
}

impl Parameter {
    fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
            binding: Binding::None,
        }
    }

    pub fn positional(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Positional)
    }

    pub fn keyword(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::KeywordOnly)
    }

    pub fn var_positional(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::VarPositional)
    }

    pub fn var_keyword(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::VarKeyword)
    }

    /// Parameter filled by sticker `S`, never by request input.
    pub fn sticker<S: Sticker>(name: impl Into<String>) -> Self {
        Self {
            binding: Binding::Sticker(StickerSpec::of::<S>()),
            ..Self::new(name, ParamKind::Positional)
        }
    }

    /// Positional parameter coerced to an integer.
    pub fn int(name: impl Into<String>) -> Self {
        Self::positional(name).coerce(ScalarType::Int)
    }

    /// Positional parameter coerced to a string.
    pub fn str(name: impl Into<String>) -> Self {
        Self::positional(name).coerce(ScalarType::Str)
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn coerce(mut self, ty: ScalarType) -> Self {
        self.binding = Binding::Coerce(ty);
        self
    }

    pub fn convert<F>(mut self, convert: F) -> Self
    where
        F: Fn(Value) -> Result<Value, Error> + Send + Sync + 'static,
    {
        self.binding = Binding::Convert(Arc::new(convert));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    fn is_sticker(&self) -> bool {
        matches!(self.binding, Binding::Sticker(_))
    }

    fn apply(&self, value: Value) -> Result<Value, Error> {
        match &self.binding {
            Binding::None | Binding::Sticker(_) => Ok(value),
            Binding::Coerce(ty) => ty
                .coerce(value)
                .map_err(|reason| Error::mismatch(format!("`{}`: {reason}", self.name))),
            Binding::Convert(convert) => convert(value),
        }
    }
}

/// Whether leftover positional input is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindMode {
    /// Leaf endpoints: every positional item must bind.
    Terminal,
    /// Resource transitions: leftovers stay on the path.
    Partial,
}

/// Positional input a binding consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consumed {
    Count(usize),
    /// A var-positional parameter absorbed everything.
    Rest,
}

/// Result of a successful bind.
#[derive(Debug, Clone)]
pub struct Bound {
    pub args: BoundArgs,
    pub consumed: Consumed,
    /// Positional input left over in partial mode.
    pub tail: Vec<Value>,
}

/// Compiled, validated parameter list.
#[derive(Debug, Clone, Default)]
pub struct Signature {
    params: Vec<Parameter>,
    arity: usize,
    var_positional: bool,
}

impl Signature {
    /// Signature taking no input at all.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn compile(params: impl IntoIterator<Item = Parameter>) -> Result<Self, Error> {
        let params: Vec<Parameter> = params.into_iter().collect();
        let mut seen = HashSet::new();
        let mut last_rank = 0;
        let mut saw_default = false;
        let mut var_positional = false;
        let mut var_keyword = false;

        for param in &params {
            let invalid = |reason: &str| {
                Err(Error::Configuration(format!(
                    "parameter `{}`: {reason}",
                    param.name
                )))
            };
            if param.name.is_empty() {
                return Err(Error::Configuration("parameter without a name".to_string()));
            }
            if !seen.insert(param.name.as_str()) {
                return invalid("duplicate name");
            }
            let rank = param.kind.rank();
            if rank < last_rank {
                return invalid("declared out of order");
            }
            last_rank = rank;

            match param.kind {
                ParamKind::VarPositional if var_positional => return invalid("second var-positional"),
                ParamKind::VarPositional => var_positional = true,
                ParamKind::VarKeyword if var_keyword => return invalid("second var-keyword"),
                ParamKind::VarKeyword => var_keyword = true,
                _ => {}
            }
            if param.kind.is_variadic() {
                if param.default.is_some() {
                    return invalid("variadic parameters take no default");
                }
                if !matches!(param.binding, Binding::None) {
                    return invalid("variadic parameters take no binding rule");
                }
            }
            if param.kind == ParamKind::Positional && !param.is_sticker() {
                if param.default.is_some() {
                    saw_default = true;
                } else if saw_default {
                    return invalid("required parameter follows a defaulted one");
                }
            }
        }

        let arity = params
            .iter()
            .filter(|p| p.kind == ParamKind::Positional && !p.is_sticker())
            .count();
        Ok(Self {
            params,
            arity,
            var_positional,
        })
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    /// Number of positional slots fed from input (stickers excluded).
    pub fn positional_arity(&self) -> usize {
        self.arity
    }

    pub fn has_var_positional(&self) -> bool {
        self.var_positional
    }

    pub async fn bind(&self, ctx: &Context, input: Input, mode: BindMode) -> Result<Bound, Error> {
        let Input { args, mut kwargs } = input;
        let supplied = args.len();
        let mut positional = args.into_iter();
        let mut taken = 0;
        let mut bound = BoundArgs::default();

        for param in &self.params {
            match param.kind {
                ParamKind::VarPositional => {
                    bound.rest = positional.by_ref().collect();
                    taken += bound.rest.len();
                }
                ParamKind::VarKeyword => {
                    bound.extra = std::mem::take(&mut kwargs);
                }
                ParamKind::Positional | ParamKind::KeywordOnly => {
                    if let Binding::Sticker(spec) = &param.binding {
                        let value = ctx.stickers().create(spec, ctx).await?;
                        bound.push(&param.name, Value::Sticker(value));
                        continue;
                    }
                    let from_position = match param.kind {
                        ParamKind::Positional => positional.next(),
                        _ => None,
                    };
                    if from_position.is_some() {
                        taken += 1;
                    }
                    let from_keyword = kwargs.remove(&param.name);
                    let value = match (from_position, from_keyword) {
                        (Some(_), Some(_)) => {
                            return Err(Error::mismatch(format!(
                                "multiple values for `{}`",
                                param.name
                            )));
                        }
                        (Some(value), None) | (None, Some(value)) => param.apply(value)?,
                        (None, None) => match &param.default {
                            Some(default) => default.clone(),
                            None => {
                                return Err(Error::mismatch(format!(
                                    "missing required argument `{}`",
                                    param.name
                                )));
                            }
                        },
                    };
                    bound.push(&param.name, value);
                }
            }
        }

        let tail: Vec<Value> = positional.collect();
        if mode == BindMode::Terminal && !tail.is_empty() {
            return Err(Error::mismatch(format!(
                "takes {} positional arguments but {} were given",
                self.arity, supplied
            )));
        }
        let consumed = if self.var_positional {
            Consumed::Rest
        } else {
            Consumed::Count(taken)
        };
        Ok(Bound {
            args: bound,
            consumed,
            tail,
        })
    }
}

/// Arguments bound to a handler, looked up by parameter name.
#[derive(Debug, Clone, Default)]
pub struct BoundArgs {
    values: Vec<(String, Value)>,
    rest: Vec<Value>,
    extra: BTreeMap<String, Value>,
}

impl BoundArgs {
    fn push(&mut self, name: &str, value: Value) {
        self.values.push((name.to_string(), value));
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn value(&self, name: &str) -> Result<&Value, Error> {
        self.get(name)
            .ok_or_else(|| Error::Internal(format!("parameter `{name}` is not bound")))
    }

    fn typed<'a, T>(
        &'a self,
        name: &str,
        expected: &str,
        pick: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Result<T, Error> {
        let value = self.value(name)?;
        pick(value).ok_or_else(|| {
            Error::Internal(format!(
                "parameter `{name}` holds {} where {expected} was expected",
                value.type_name()
            ))
        })
    }

    pub fn str(&self, name: &str) -> Result<&str, Error> {
        self.typed(name, "str", Value::as_str)
    }

    pub fn int(&self, name: &str) -> Result<i64, Error> {
        self.typed(name, "int", Value::as_int)
    }

    pub fn float(&self, name: &str) -> Result<f64, Error> {
        self.typed(name, "float", Value::as_float)
    }

    pub fn bool(&self, name: &str) -> Result<bool, Error> {
        self.typed(name, "bool", Value::as_bool)
    }

    /// `None` when the parameter fell back to a null default.
    pub fn opt_int(&self, name: &str) -> Result<Option<i64>, Error> {
        match self.value(name)? {
            Value::Null => Ok(None),
            _ => self.int(name).map(Some),
        }
    }

    pub fn opt_str(&self, name: &str) -> Result<Option<&str>, Error> {
        match self.value(name)? {
            Value::Null => Ok(None),
            _ => self.str(name).map(Some),
        }
    }

    pub fn sticker<S: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<S>, Error> {
        self.typed(name, std::any::type_name::<S>(), |value| match value {
            Value::Sticker(sticker) => sticker.downcast::<S>(),
            _ => None,
        })
    }

    /// Input absorbed by the var-positional parameter.
    pub fn rest(&self) -> &[Value] {
        &self.rest
    }

    /// Keyword input collected by the var-keyword parameter.
    pub fn extra(&self) -> &BTreeMap<String, Value> {
        &self.extra
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
