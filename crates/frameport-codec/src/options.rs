//! Encoder feature toggles.
//!
//! Every field is optional so that several layers (encoder defaults,
//! transport defaults, a process-wide override, per-call options) can be
//! stacked with [`CodecOptions::merge`]. Unset fields fall back to the
//! encoder defaults exposed by the accessor methods.

/// Default maximum nesting depth when no layer sets one.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Controls what structural types the encoder may serialize, and how.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodecOptions {
    /// Encode regular expressions as `_regexp_` markers.
    pub allow_reg_exp: Option<bool>,
    /// Encode functions as `_function_` markers.
    pub allow_function: Option<bool>,
    /// Encode symbols as `_symbol_` markers.
    pub allow_symbol: Option<bool>,
    /// Encode dates as `_date_` markers.
    pub allow_date: Option<bool>,
    /// Encode `undefined` as the `_undefined_` marker.
    pub allow_undefined: Option<bool>,
    /// Record the class name of class instances.
    pub allow_class: Option<bool>,
    /// Maximum container nesting; deeper containers are omitted.
    pub max_depth: Option<usize>,
    /// Indent width for pretty-printed output. `None` or `0` is compact.
    pub space: Option<usize>,
    /// Keep function bodies unevaluated on decode.
    pub lazy_eval: Option<bool>,
}

impl CodecOptions {
    /// Overlay `other` on top of `self`; fields set in `other` win.
    pub fn merge(&self, other: &CodecOptions) -> CodecOptions {
        CodecOptions {
            allow_reg_exp: other.allow_reg_exp.or(self.allow_reg_exp),
            allow_function: other.allow_function.or(self.allow_function),
            allow_symbol: other.allow_symbol.or(self.allow_symbol),
            allow_date: other.allow_date.or(self.allow_date),
            allow_undefined: other.allow_undefined.or(self.allow_undefined),
            allow_class: other.allow_class.or(self.allow_class),
            max_depth: other.max_depth.or(self.max_depth),
            space: other.space.or(self.space),
            lazy_eval: other.lazy_eval.or(self.lazy_eval),
        }
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        *self == CodecOptions::default()
    }

    pub fn reg_exp_allowed(&self) -> bool {
        self.allow_reg_exp.unwrap_or(true)
    }

    pub fn function_allowed(&self) -> bool {
        self.allow_function.unwrap_or(true)
    }

    pub fn symbol_allowed(&self) -> bool {
        self.allow_symbol.unwrap_or(true)
    }

    pub fn date_allowed(&self) -> bool {
        self.allow_date.unwrap_or(true)
    }

    pub fn undefined_allowed(&self) -> bool {
        self.allow_undefined.unwrap_or(true)
    }

    pub fn class_allowed(&self) -> bool {
        self.allow_class.unwrap_or(true)
    }

    pub fn depth_limit(&self) -> usize {
        self.max_depth.unwrap_or(DEFAULT_MAX_DEPTH)
    }

    pub fn indent(&self) -> Option<usize> {
        self.space.filter(|width| *width > 0)
    }

    pub fn lazy(&self) -> bool {
        self.lazy_eval.unwrap_or(true)
    }
}
