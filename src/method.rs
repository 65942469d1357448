//! Module containing concept of an Ethereum RPC method.

use crate::{
    normalize::{self, Input, InvalidInputError, Kind},
    schema::Schema,
    types::{BlockSelector, BlockTag, Hydrated, LogFilter, TransactionRequest},
};
use serde_json::Value;

/// A trait defining an Ethereum RPC method.
pub trait Method {
    /// The JSON RPC method name.
    fn name(&self) -> &'static str;

    /// The kinds of the positional parameters.
    fn params(&self) -> &'static [Param];

    /// The schema of the result.
    fn result(&self) -> Schema;
}

/// The kind of a positional method parameter.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Param {
    Address,
    Quantity,
    Hash,
    Bytes,
    /// A block tag, number or hash.
    Block,
    /// Whether to hydrate block transactions.
    Hydrated,
    Transaction,
    Filter,
    /// A list of 32-byte hashes or storage keys.
    Hashes,
    /// Reward percentiles in the `0..=100` range.
    Percentiles,
}

impl Param {
    fn kind(self) -> Option<Kind> {
        match self {
            Self::Address => Some(Kind::Address),
            Self::Quantity => Some(Kind::Quantity),
            Self::Hash | Self::Hashes => Some(Kind::Hash),
            Self::Bytes => Some(Kind::Bytes),
            _ => None,
        }
    }
}

/// A method argument supplied by a caller.
#[derive(Clone, Debug, PartialEq)]
pub enum Arg {
    Value(Input),
    Block(BlockSelector),
    Bool(bool),
    Transaction(TransactionRequest),
    Filter(LogFilter),
    List(Vec<Input>),
    Floats(Vec<f64>),
}

impl From<Input> for Arg {
    fn from(value: Input) -> Self {
        Self::Value(value)
    }
}

impl From<BlockSelector> for Arg {
    fn from(block: BlockSelector) -> Self {
        Self::Block(block)
    }
}

impl From<BlockTag> for Arg {
    fn from(tag: BlockTag) -> Self {
        Self::Block(tag.into())
    }
}

impl From<Hydrated> for Arg {
    fn from(hydrated: Hydrated) -> Self {
        Self::Bool(hydrated.as_bool())
    }
}

impl From<TransactionRequest> for Arg {
    fn from(tx: TransactionRequest) -> Self {
        Self::Transaction(tx)
    }
}

impl From<LogFilter> for Arg {
    fn from(filter: LogFilter) -> Self {
        Self::Filter(filter)
    }
}

/// Encodes arguments into the positional JSON RPC parameters of a method,
/// normalizing every numeric and byte value into its wire encoding.
pub fn encode_params<M>(method: &M, args: &[Arg]) -> Result<Value, InvalidInputError>
where
    M: Method + ?Sized,
{
    let params = method.params();
    if params.len() != args.len() {
        return Err(InvalidInputError::expected(
            method.name(),
            "parameters for",
            &format!("expected {} arguments but got {}", params.len(), args.len()),
        ));
    }

    params
        .iter()
        .zip(args)
        .map(|(param, arg)| encode_param(method.name(), *param, arg))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

fn encode_param(method: &str, param: Param, arg: &Arg) -> Result<Value, InvalidInputError> {
    Ok(match (param.kind(), param, arg) {
        (Some(kind), Param::Hashes, Arg::List(values)) => values
            .iter()
            .map(|value| normalize::normalize(value, kind).map(Value::from))
            .collect::<Result<Vec<_>, _>>()?
            .into(),
        (Some(kind), _, Arg::Value(value)) if param != Param::Hashes => {
            normalize::normalize(value, kind)?.into()
        }
        (_, Param::Block, Arg::Block(block)) => block.encode()?.into(),
        (_, Param::Hydrated, Arg::Bool(value)) => (*value).into(),
        (_, Param::Transaction, Arg::Transaction(tx)) => tx.encode()?,
        (_, Param::Filter, Arg::Filter(filter)) => filter.encode()?,
        (_, Param::Percentiles, Arg::Floats(percentiles)) => {
            if let Some(bad) = percentiles
                .iter()
                .find(|p| !p.is_finite() || !(0.0..=100.0).contains(*p))
            {
                return Err(InvalidInputError::expected(
                    bad,
                    "percentile",
                    "expected a value between 0 and 100",
                ));
            }
            percentiles.clone().into()
        }
        _ => {
            return Err(InvalidInputError::expected(
                method,
                "parameters for",
                &format!("argument does not match {param:?} parameter"),
            ))
        }
    })
}

#[macro_export]
macro_rules! method {
    (
        $(#[$attr:meta])*
        $pub:vis struct $type:ident as $name:literal
            [$($param:ident),* $(,)?] => $result:ident;
    ) => {
        $(#[$attr])*
        #[derive(Clone, Copy, Default)]
        $pub struct $type;

        impl ::std::fmt::Debug for $type {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                f.debug_tuple(stringify!($type))
                    .field(&$name)
                    .finish()
            }
        }

        impl $crate::method::Method for $type {
            fn name(&self) -> &'static str {
                $name
            }

            fn params(&self) -> &'static [$crate::method::Param] {
                &[$($crate::method::Param::$param),*]
            }

            fn result(&self) -> $crate::schema::Schema {
                $crate::schema::$result
            }
        }
    };
}

#[macro_export]
macro_rules! module {
    (
        $(#[$attr:meta])*
        $pub:vis mod $mod:ident {
            $(
                $(#[$ma:meta])*
                $mv:vis struct $mt:ident as $mn:literal
                    [$($mp:ident),* $(,)?] => $mr:ident;
            )*
        }
    ) => {
        $(#[$attr])*
        $pub mod $mod {
            $(
                $crate::method! {
                    $(#[$ma])* $mv struct $mt as $mn [$($mp),*] => $mr;
                }
            )*
        }
    };
}
