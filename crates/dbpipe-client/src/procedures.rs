//! Typed wrappers for every catalog procedure.
//!
//! Each wrapper builds its arguments in descriptor order, calls through the
//! session and turns the result slots into plain Rust values.

use dbpipe_protocol::catalog::{
    ADD_COLUMN, BEGIN_TRANSACTION, CLOSE_DATABASE, COMMIT_TRANSACTION, CREATE_DATABASE,
    CREATE_INDEX, DELETE_DATABASE, DROP_COLUMN, DROP_INDEX, DROP_TABLE, EXECUTE_IMMEDIATE,
    FIND_DATABASE, GET_NUM_ROWS, HANDSHAKE, LIST_DATABASES, LIST_TABLES, OPEN_DATABASE,
};
use dbpipe_protocol::{ProcedureDescriptor, ProtocolError, WireValue, abi_token};

use crate::error::ClientResult;
use crate::session::{DatabaseHandle, DriverSession};

/// Column types understood by drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Integer,
    Double,
    Text,
    Date,
    Timestamp,
}

impl SqlType {
    /// Code sent on the wire.
    pub fn code(self) -> i32 {
        match self {
            Self::Integer => 1,
            Self::Double => 2,
            Self::Text => 3,
            Self::Date => 4,
            Self::Timestamp => 5,
        }
    }
}

/// Column to add with [`add_column`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub sql_type: SqlType,
    /// Declared length; 0 when the type has none.
    pub length: i32,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            length: 0,
        }
    }

    pub fn with_length(mut self, length: i32) -> Self {
        self.length = length;
        self
    }
}

/// Index to create with [`create_index`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub table: String,
    pub name: String,
    pub unique: bool,
    pub columns: Vec<String>,
}

fn flag(value: bool) -> WireValue {
    WireValue::Int32(i32::from(value))
}

fn call_unit(
    session: &mut DriverSession,
    procedure: &'static ProcedureDescriptor,
    args: &[WireValue],
) -> ClientResult<()> {
    session.call(procedure, args)?;
    Ok(())
}

fn call_single(
    session: &mut DriverSession,
    procedure: &'static ProcedureDescriptor,
    args: &[WireValue],
) -> ClientResult<WireValue> {
    session
        .call(procedure, args)?
        .into_iter()
        .next()
        .ok_or_else(|| {
            ProtocolError::UnexpectedValue {
                expected: "result",
                found: "nothing",
            }
            .into()
        })
}

/// Exchanges ABI tokens and returns the driver's name.
pub fn handshake(session: &mut DriverSession) -> ClientResult<String> {
    let token = WireValue::Record(abi_token().to_vec());
    Ok(call_single(session, &HANDSHAKE, &[token])?.into_string()?)
}

/// Opens `database` and makes it current for the session.
pub fn open_database(
    session: &mut DriverSession,
    database: &str,
    schema: &str,
) -> ClientResult<()> {
    call_unit(session, &OPEN_DATABASE, &[database.into(), schema.into()])?;
    session.set_database(Some(DatabaseHandle {
        database: database.to_string(),
        schema: schema.to_string(),
    }));
    Ok(())
}

/// Closes the current database.
pub fn close_database(session: &mut DriverSession) -> ClientResult<()> {
    call_unit(session, &CLOSE_DATABASE, &[])?;
    session.set_database(None);
    Ok(())
}

pub fn create_database(
    session: &mut DriverSession,
    database: &str,
    location: &str,
) -> ClientResult<()> {
    call_unit(session, &CREATE_DATABASE, &[database.into(), location.into()])
}

pub fn delete_database(
    session: &mut DriverSession,
    database: &str,
    location: &str,
) -> ClientResult<()> {
    call_unit(session, &DELETE_DATABASE, &[database.into(), location.into()])
}

/// Whether the driver knows `database`.
pub fn find_database(session: &mut DriverSession, database: &str) -> ClientResult<bool> {
    Ok(call_single(session, &FIND_DATABASE, &[database.into()])?.as_i32()? != 0)
}

pub fn list_databases(session: &mut DriverSession, location: &str) -> ClientResult<Vec<String>> {
    Ok(call_single(session, &LIST_DATABASES, &[location.into()])?.into_strings()?)
}

/// Table names in the current database, optionally with system tables.
pub fn list_tables(session: &mut DriverSession, include_system: bool) -> ClientResult<Vec<String>> {
    Ok(call_single(session, &LIST_TABLES, &[flag(include_system)])?.into_strings()?)
}

pub fn drop_table(session: &mut DriverSession, table: &str) -> ClientResult<()> {
    call_unit(session, &DROP_TABLE, &[table.into()])
}

pub fn add_column(
    session: &mut DriverSession,
    table: &str,
    column: &ColumnSpec,
) -> ClientResult<()> {
    call_unit(
        session,
        &ADD_COLUMN,
        &[
            table.into(),
            column.name.as_str().into(),
            WireValue::Int32(column.sql_type.code()),
            WireValue::Int32(column.length),
        ],
    )
}

pub fn drop_column(session: &mut DriverSession, table: &str, column: &str) -> ClientResult<()> {
    call_unit(session, &DROP_COLUMN, &[table.into(), column.into()])
}

/// Runs a statement that returns no rows.
pub fn execute_immediate(session: &mut DriverSession, sql: &str) -> ClientResult<()> {
    call_unit(session, &EXECUTE_IMMEDIATE, &[sql.into()])
}

pub fn begin_transaction(session: &mut DriverSession) -> ClientResult<()> {
    call_unit(session, &BEGIN_TRANSACTION, &[])
}

pub fn commit_transaction(session: &mut DriverSession) -> ClientResult<()> {
    call_unit(session, &COMMIT_TRANSACTION, &[])
}

pub fn get_num_rows(session: &mut DriverSession, table: &str) -> ClientResult<i64> {
    Ok(call_single(session, &GET_NUM_ROWS, &[table.into()])?.as_i64()?)
}

pub fn create_index(session: &mut DriverSession, index: &IndexSpec) -> ClientResult<()> {
    call_unit(
        session,
        &CREATE_INDEX,
        &[
            index.table.as_str().into(),
            index.name.as_str().into(),
            flag(index.unique),
            WireValue::strings(&index.columns),
        ],
    )
}

pub fn drop_index(session: &mut DriverSession, index: &str) -> ClientResult<()> {
    call_unit(session, &DROP_INDEX, &[index.into()])
}
