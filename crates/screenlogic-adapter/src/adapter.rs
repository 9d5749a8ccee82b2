//! Adapter -- the public face: one method per protocol operation.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use screenlogic_protocol::{ControllerConfig, ControllerStatus};

use crate::config::{AdapterConfig, AdapterOptions};
use crate::error::Result;
use crate::manager::ConnectionManager;
use crate::operations;
use crate::transport::{Connector, TcpConnector};

#[derive(Clone)]
pub struct Adapter {
    manager: ConnectionManager,
}

impl Adapter {
    /// Adapter for the controller at `config.ip_address`. Nothing is dialed
    /// until the first operation.
    pub fn new(config: &AdapterConfig) -> Result<Self> {
        config.validate()?;
        let opts = config.options();
        let connector = TcpConnector::new(config.socket_addr()?, opts.timeout);
        Ok(Self::with_connector(Arc::new(connector), opts))
    }

    pub fn with_connector(connector: Arc<dyn Connector>, options: AdapterOptions) -> Self {
        Self {
            manager: ConnectionManager::new(connector, options),
        }
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    /// Controller wall-clock time.
    pub async fn get_time(&self) -> Result<NaiveDateTime> {
        let mut s = self.manager.acquire().await?;
        operations::get_time_and_date(&mut s).await
    }

    pub async fn get_version(&self) -> Result<String> {
        let mut s = self.manager.acquire().await?;
        operations::get_version(&mut s).await
    }

    pub async fn get_config(&self) -> Result<ControllerConfig> {
        let mut s = self.manager.acquire().await?;
        operations::get_controller_config(&mut s).await
    }

    pub async fn get_status(&self) -> Result<ControllerStatus> {
        let mut s = self.manager.acquire().await?;
        operations::get_controller_status(&mut s).await
    }

    pub async fn set_circuit(&self, circuit_id: u32, on: bool) -> Result<()> {
        let mut s = self.manager.acquire().await?;
        operations::set_circuit_state(&mut s, circuit_id, on).await
    }

    /// Flip a circuit and return its new state.
    pub async fn toggle_circuit(&self, circuit_id: u32) -> Result<bool> {
        let mut s = self.manager.acquire().await?;
        let status = operations::get_controller_status(&mut s).await?;
        let on = !status.status_for_id(circuit_id).unwrap_or(false);
        operations::set_circuit_state(&mut s, circuit_id, on).await?;
        Ok(on)
    }

    pub async fn close(&self, grace: Duration) -> Result<()> {
        self.manager.close(grace).await
    }
}
