//! Intermediate results of the lowering.
//!
//! Every translated sub-expression becomes a [`QueryPiece`]: its PromQL value
//! kind ([`ResultType`]) plus the physical form that value currently has
//! ([`Store`]). The payload each form needs travels inside the `Store`
//! variant, so a piece can never carry a query it should not have.

use std::fmt;

use crate::promql::{Duration, NodeEvaluationRange, NodeId, Timestamp};
use crate::sql::SelectQuery;

/// The PromQL value kind of a sub-expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultType {
    Scalar,
    String,
    InstantVector,
    RangeVector,
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResultType::Scalar => "scalar",
            ResultType::String => "string",
            ResultType::InstantVector => "instant vector",
            ResultType::RangeVector => "range vector",
        };
        f.write_str(name)
    }
}

/// The physical carrier of a piece's value, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreMethod {
    Empty,
    ConstScalar,
    ConstString,
    SingleScalar,
    ScalarGrid,
    VectorGrid,
    RawData,
}

impl fmt::Display for StoreMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StoreMethod::Empty => "EMPTY",
            StoreMethod::ConstScalar => "CONST_SCALAR",
            StoreMethod::ConstString => "CONST_STRING",
            StoreMethod::SingleScalar => "SINGLE_SCALAR",
            StoreMethod::ScalarGrid => "SCALAR_GRID",
            StoreMethod::VectorGrid => "VECTOR_GRID",
            StoreMethod::RawData => "RAW_DATA",
        };
        f.write_str(name)
    }
}

/// A store method together with its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Store {
    /// No rows for the requested range; no query.
    Empty,
    /// Value known at translation time.
    ConstScalar(f64),
    ConstString(String),
    /// One row, one column `value`.
    SingleScalar(SelectQuery),
    /// One row, column `values`: an array aligned to the grid.
    ScalarGrid(SelectQuery),
    /// One row per series: `group`, `values` (nullable per grid point).
    VectorGrid(SelectQuery),
    /// Ungridded samples: `group`, `timestamp`, `value`.
    RawData(SelectQuery),
}

impl Store {
    pub fn method(&self) -> StoreMethod {
        match self {
            Store::Empty => StoreMethod::Empty,
            Store::ConstScalar(_) => StoreMethod::ConstScalar,
            Store::ConstString(_) => StoreMethod::ConstString,
            Store::SingleScalar(_) => StoreMethod::SingleScalar,
            Store::ScalarGrid(_) => StoreMethod::ScalarGrid,
            Store::VectorGrid(_) => StoreMethod::VectorGrid,
            Store::RawData(_) => StoreMethod::RawData,
        }
    }

    pub fn query(&self) -> Option<&SelectQuery> {
        match self {
            Store::SingleScalar(q)
            | Store::ScalarGrid(q)
            | Store::VectorGrid(q)
            | Store::RawData(q) => Some(q),
            Store::Empty | Store::ConstScalar(_) | Store::ConstString(_) => None,
        }
    }

    pub fn into_query(self) -> Option<SelectQuery> {
        match self {
            Store::SingleScalar(q)
            | Store::ScalarGrid(q)
            | Store::VectorGrid(q)
            | Store::RawData(q) => Some(q),
            Store::Empty | Store::ConstScalar(_) | Store::ConstString(_) => None,
        }
    }
}

/// One translated sub-expression.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPiece {
    /// The node this piece was produced for; used for diagnostics only.
    pub node: NodeId,
    pub result_type: ResultType,
    pub store: Store,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub step: Duration,
    pub window: Duration,
}

impl QueryPiece {
    /// A piece known to produce no rows.
    pub fn empty(node: NodeId, result_type: ResultType) -> Self {
        Self {
            node,
            result_type,
            store: Store::Empty,
            start_time: 0,
            end_time: 0,
            step: 0,
            window: 0,
        }
    }

    pub fn new(
        node: NodeId,
        result_type: ResultType,
        store: Store,
        range: NodeEvaluationRange,
    ) -> Self {
        Self {
            node,
            result_type,
            store,
            start_time: range.start_time,
            end_time: range.end_time,
            step: range.step,
            window: range.window,
        }
    }

    pub fn store_method(&self) -> StoreMethod {
        self.store.method()
    }

    /// Moves the piece to another node and result type, keeping its data.
    pub fn relabel(mut self, node: NodeId, result_type: ResultType) -> Self {
        self.node = node;
        self.result_type = result_type;
        self
    }

    /// Moves the store out, leaving `Empty` behind.
    pub fn take_store(&mut self) -> Store {
        std::mem::replace(&mut self.store, Store::Empty)
    }

    pub fn with_store(mut self, store: Store) -> Self {
        self.store = store;
        self
    }

    pub fn range(&self) -> NodeEvaluationRange {
        NodeEvaluationRange {
            start_time: self.start_time,
            end_time: self.end_time,
            step: self.step,
            window: self.window,
        }
    }

    pub fn scalar_value(&self) -> Option<f64> {
        match self.store {
            Store::ConstScalar(v) => Some(v),
            _ => None,
        }
    }
}
