//! Procedure catalog.
//!
//! Each procedure is identified on the wire by a small integer and has a
//! fixed, ordered list of argument and result shapes. Order is the whole
//! contract: fields carry no names, so client and driver must agree on the
//! table below.
//!
//! ```text
//! client -> driver   [i32 procedure id][arg 1]...[arg N]
//! driver -> client   [i32 status] then, only on success, [result 1]...[result M]
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::wire::WireType;

/// Wire protocol revision carried in the handshake token.
pub const PROTOCOL_VERSION: u16 = 1;

/// Size of the handshake ABI token.
pub const ABI_TOKEN_LEN: usize = 8;

const ABI_MAGIC: [u8; 4] = *b"DBPW";
const INT_WIDTH: u8 = 4;
const BIG_ENDIAN_MARKER: u8 = 1;

/// Token describing this side's wire conventions.
///
/// The driver compares it with its own and refuses the handshake on any
/// difference, so a width or byte-order mismatch fails before the first
/// real call instead of silently misdecoding.
pub fn abi_token() -> [u8; ABI_TOKEN_LEN] {
    let version = PROTOCOL_VERSION.to_be_bytes();
    [
        ABI_MAGIC[0],
        ABI_MAGIC[1],
        ABI_MAGIC[2],
        ABI_MAGIC[3],
        version[0],
        version[1],
        INT_WIDTH,
        BIG_ENDIAN_MARKER,
    ]
}

/// Static description of one procedure.
#[derive(Debug, PartialEq, Eq)]
pub struct ProcedureDescriptor {
    /// Identifier sent at the start of every call.
    pub id: i32,
    /// Name used in logs and errors.
    pub name: &'static str,
    /// Argument shapes, in send order.
    pub args: &'static [WireType],
    /// Result shapes, in receive order; read only after a success status.
    pub results: &'static [WireType],
}

const STRINGS: WireType = WireType::Sequence(&WireType::String);

pub static HANDSHAKE: ProcedureDescriptor = ProcedureDescriptor {
    id: 1,
    name: "handshake",
    args: &[WireType::Record(ABI_TOKEN_LEN)],
    results: &[WireType::String],
};

pub static OPEN_DATABASE: ProcedureDescriptor = ProcedureDescriptor {
    id: 2,
    name: "open_database",
    args: &[WireType::String, WireType::String],
    results: &[],
};

pub static CLOSE_DATABASE: ProcedureDescriptor = ProcedureDescriptor {
    id: 3,
    name: "close_database",
    args: &[],
    results: &[],
};

pub static CREATE_DATABASE: ProcedureDescriptor = ProcedureDescriptor {
    id: 4,
    name: "create_database",
    args: &[WireType::String, WireType::String],
    results: &[],
};

pub static DELETE_DATABASE: ProcedureDescriptor = ProcedureDescriptor {
    id: 5,
    name: "delete_database",
    args: &[WireType::String, WireType::String],
    results: &[],
};

pub static FIND_DATABASE: ProcedureDescriptor = ProcedureDescriptor {
    id: 6,
    name: "find_database",
    args: &[WireType::String],
    results: &[WireType::Int32],
};

pub static LIST_DATABASES: ProcedureDescriptor = ProcedureDescriptor {
    id: 7,
    name: "list_databases",
    args: &[WireType::String],
    results: &[STRINGS],
};

pub static LIST_TABLES: ProcedureDescriptor = ProcedureDescriptor {
    id: 8,
    name: "list_tables",
    args: &[WireType::Int32],
    results: &[STRINGS],
};

pub static DROP_TABLE: ProcedureDescriptor = ProcedureDescriptor {
    id: 9,
    name: "drop_table",
    args: &[WireType::String],
    results: &[],
};

pub static ADD_COLUMN: ProcedureDescriptor = ProcedureDescriptor {
    id: 10,
    name: "add_column",
    args: &[
        WireType::String,
        WireType::String,
        WireType::Int32,
        WireType::Int32,
    ],
    results: &[],
};

pub static DROP_COLUMN: ProcedureDescriptor = ProcedureDescriptor {
    id: 11,
    name: "drop_column",
    args: &[WireType::String, WireType::String],
    results: &[],
};

pub static EXECUTE_IMMEDIATE: ProcedureDescriptor = ProcedureDescriptor {
    id: 12,
    name: "execute_immediate",
    args: &[WireType::String],
    results: &[],
};

pub static BEGIN_TRANSACTION: ProcedureDescriptor = ProcedureDescriptor {
    id: 13,
    name: "begin_transaction",
    args: &[],
    results: &[],
};

pub static COMMIT_TRANSACTION: ProcedureDescriptor = ProcedureDescriptor {
    id: 14,
    name: "commit_transaction",
    args: &[],
    results: &[],
};

pub static GET_NUM_ROWS: ProcedureDescriptor = ProcedureDescriptor {
    id: 15,
    name: "get_num_rows",
    args: &[WireType::String],
    results: &[WireType::Int64],
};

pub static CREATE_INDEX: ProcedureDescriptor = ProcedureDescriptor {
    id: 16,
    name: "create_index",
    args: &[WireType::String, WireType::String, WireType::Int32, STRINGS],
    results: &[],
};

pub static DROP_INDEX: ProcedureDescriptor = ProcedureDescriptor {
    id: 17,
    name: "drop_index",
    args: &[WireType::String],
    results: &[],
};

/// Every procedure, in id order.
pub static CATALOG: &[&ProcedureDescriptor] = &[
    &HANDSHAKE,
    &OPEN_DATABASE,
    &CLOSE_DATABASE,
    &CREATE_DATABASE,
    &DELETE_DATABASE,
    &FIND_DATABASE,
    &LIST_DATABASES,
    &LIST_TABLES,
    &DROP_TABLE,
    &ADD_COLUMN,
    &DROP_COLUMN,
    &EXECUTE_IMMEDIATE,
    &BEGIN_TRANSACTION,
    &COMMIT_TRANSACTION,
    &GET_NUM_ROWS,
    &CREATE_INDEX,
    &DROP_INDEX,
];

static BY_ID: LazyLock<HashMap<i32, &'static ProcedureDescriptor>> =
    LazyLock::new(|| CATALOG.iter().map(|d| (d.id, *d)).collect());

static BY_NAME: LazyLock<HashMap<&'static str, &'static ProcedureDescriptor>> =
    LazyLock::new(|| CATALOG.iter().map(|d| (d.name, *d)).collect());

/// Finds a procedure by wire id.
pub fn lookup(id: i32) -> Option<&'static ProcedureDescriptor> {
    BY_ID.get(&id).copied()
}

/// Finds a procedure by name.
pub fn by_name(name: &str) -> Option<&'static ProcedureDescriptor> {
    BY_NAME.get(name).copied()
}
