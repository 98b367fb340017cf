/// Connection Management Module
///
/// This module owns the single, lazily-established connection handle of an
/// adapter and drives the autocommit-based transaction state machine.

use crate::config::ConnectionConfig;
use crate::core::driver::{Driver, DriverConnection, DriverError};
use crate::core::{AdapterError, Result, TransactionStep};
use std::fmt;
use tracing::{error, info, warn};

/// Represents database transaction states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionState {
    /// No active transaction (autocommit mode)
    #[default]
    Autocommit,
    /// Autocommit disabled; work is pending until commit or rollback
    InTransaction,
}

/// Connection manager for one adapter instance
///
/// Holds at most one live handle. There is no pooling: the handle is created
/// on first use and dropped on [`disconnect`](ConnectionManager::disconnect).
pub struct ConnectionManager<D: Driver> {
    driver: D,
    config: ConnectionConfig,
    connection: Option<D::Connection>,
    transaction_state: TransactionState,
}

impl<D: Driver> fmt::Debug for ConnectionManager<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("dsn", &self.config.dsn())
            .field("connected", &self.connection.is_some())
            .field("transaction_state", &self.transaction_state)
            .finish()
    }
}

impl<D: Driver> ConnectionManager<D> {
    /// Creates a new connection manager; no connection is opened yet
    pub fn new(driver: D, config: ConnectionConfig) -> Self {
        ConnectionManager {
            driver,
            config,
            connection: None,
            transaction_state: TransactionState::default(),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Connects using the DSN derived from the config
    ///
    /// Replaces any existing handle.
    ///
    /// # Errors
    ///
    /// Returns `AdapterError::Connection` carrying the attempted DSN and the
    /// driver's error text.
    pub fn connect(&mut self) -> Result<()> {
        let conn = self.open()?;
        self.connection = Some(conn);
        self.transaction_state = TransactionState::Autocommit;
        Ok(())
    }

    /// Returns the cached handle, connecting first if there is none
    pub fn connection(&mut self) -> Result<&mut D::Connection> {
        let conn = match self.connection.take() {
            Some(conn) => conn,
            None => {
                let conn = self.open()?;
                self.transaction_state = TransactionState::Autocommit;
                conn
            }
        };
        Ok(self.connection.insert(conn))
    }

    fn open(&self) -> Result<D::Connection> {
        let dsn = self.config.dsn();
        let conn = self
            .driver
            .connect(dsn, self.config.user(), self.config.password())
            .map_err(|source| {
                error!("Failed to connect with DSN {}: {}", dsn, source);
                AdapterError::Connection {
                    dsn: dsn.to_string(),
                    source,
                }
            })?;
        info!("Connected to {} as {}", dsn, self.config.user());
        Ok(conn)
    }

    /// Drops the handle and resets the transaction state
    pub fn disconnect(&mut self) {
        if self.connection.take().is_some() {
            info!("Disconnected from {}", self.config.dsn());
        }
        self.transaction_state = TransactionState::Autocommit;
    }

    /// Checks if there's an open handle
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn transaction_state(&self) -> TransactionState {
        self.transaction_state
    }

    /// Drops the handle when `err` reports that it is no longer usable.
    ///
    /// Pending transaction work is lost with the handle, so the state
    /// returns to Autocommit and the next call reconnects.
    pub fn invalidate_if_fatal(&mut self, err: &DriverError) -> bool {
        let fatal = self
            .connection
            .as_ref()
            .is_some_and(|conn| conn.is_fatal(err));
        if fatal {
            warn!("Dropping connection to {} after fatal error: {}", self.config.dsn(), err);
            self.connection = None;
            self.transaction_state = TransactionState::Autocommit;
        }
        fatal
    }

    fn transaction_error(&mut self, step: TransactionStep, err: DriverError) -> AdapterError {
        self.invalidate_if_fatal(&err);
        AdapterError::transaction(step, err)
    }

    /// Starts a transaction by disabling autocommit
    pub fn begin_transaction(&mut self) -> Result<()> {
        let result = self.connection()?.set_autocommit(false);
        if let Err(e) = result {
            return Err(self.transaction_error(TransactionStep::Begin, e));
        }
        self.transaction_state = TransactionState::InTransaction;
        info!("Transaction started");
        Ok(())
    }

    /// Commits pending work, then re-enables autocommit
    ///
    /// # Errors
    ///
    /// `TransactionStep::Commit` if the commit itself failed (work is not
    /// committed), `TransactionStep::EnableAutocommit` if the commit went
    /// through but the connection is still in manual-commit mode.
    pub fn commit(&mut self) -> Result<()> {
        self.require_transaction(TransactionStep::Commit)?;
        let result = self.connection()?.commit();
        if let Err(e) = result {
            return Err(self.transaction_error(TransactionStep::Commit, e));
        }
        let result = self.connection()?.set_autocommit(true);
        if let Err(e) = result {
            return Err(self.transaction_error(TransactionStep::EnableAutocommit, e));
        }

        self.transaction_state = TransactionState::Autocommit;
        info!("Transaction committed");
        Ok(())
    }

    /// Rolls back pending work
    ///
    /// Autocommit is not re-enabled: the connection stays in manual-commit
    /// mode until [`commit`](ConnectionManager::commit) is called.
    pub fn rollback(&mut self) -> Result<()> {
        self.require_transaction(TransactionStep::Rollback)?;
        let result = self.connection()?.rollback();
        if let Err(e) = result {
            return Err(self.transaction_error(TransactionStep::Rollback, e));
        }
        info!("Transaction rolled back");
        Ok(())
    }

    fn require_transaction(&self, step: TransactionStep) -> Result<()> {
        if self.transaction_state != TransactionState::InTransaction {
            return Err(AdapterError::Transaction {
                step,
                message: "No transaction in progress".to_string(),
                code: "25000".to_string(),
            });
        }
        Ok(())
    }
}
