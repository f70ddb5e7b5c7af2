//! Commands that run procedures on a driver.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{ClientError, ClientResult};
use crate::procedures;
use crate::session::DriverSession;

/// How command results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Text,
    Json,
}

impl Output {
    pub fn from_json_flag(json: bool) -> Self {
        if json { Self::Json } else { Self::Text }
    }

    fn print_json<T: Serialize>(value: &T) -> ClientResult<()> {
        let text = serde_json::to_string(value)
            .map_err(|e| ClientError::Config(format!("failed to serialize output: {}", e)))?;
        println!("{}", text);
        Ok(())
    }

    fn list(self, key: &str, items: &[String]) -> ClientResult<()> {
        match self {
            Self::Json => Self::print_json(&BTreeMap::from([(key, items)])),
            Self::Text => {
                for item in items {
                    println!("{}", item);
                }
                Ok(())
            }
        }
    }

    fn done(self, message: &str) -> ClientResult<()> {
        match self {
            Self::Json => Self::print_json(&serde_json::json!({ "ok": true })),
            Self::Text => {
                println!("{}", message);
                Ok(())
            }
        }
    }
}

/// Print the driver name from the handshake.
pub fn handshake(session: &DriverSession, output: Output) -> ClientResult<()> {
    let driver = session.driver_name().unwrap_or("unknown");
    match output {
        Output::Json => Output::print_json(&serde_json::json!({ "driver": driver })),
        Output::Text => {
            println!("{}", driver);
            Ok(())
        }
    }
}

pub fn databases(session: &mut DriverSession, location: &str, output: Output) -> ClientResult<()> {
    let names = procedures::list_databases(session, location)?;
    output.list("databases", &names)
}

pub fn tables(session: &mut DriverSession, system: bool, output: Output) -> ClientResult<()> {
    let names = procedures::list_tables(session, system)?;
    output.list("tables", &names)
}

pub fn rows(session: &mut DriverSession, table: &str, output: Output) -> ClientResult<()> {
    let count = procedures::get_num_rows(session, table)?;
    match output {
        Output::Json => Output::print_json(&serde_json::json!({ "table": table, "rows": count })),
        Output::Text => {
            println!("{}", count);
            Ok(())
        }
    }
}

pub fn drop_column(
    session: &mut DriverSession,
    table: &str,
    column: &str,
    output: Output,
) -> ClientResult<()> {
    procedures::drop_column(session, table, column)?;
    output.done(&format!("Dropped column {}.{}", table, column))
}

pub fn exec(session: &mut DriverSession, sql: &str, output: Output) -> ClientResult<()> {
    procedures::execute_immediate(session, sql)?;
    output.done("OK")
}
