//! Read request builder
//!
//! Registers every field of the mapping table on a fresh builder obtained
//! from the connection and finalizes one batched request.

use plc_link::{PlcConnection, ReadRequest};
use tracing::debug;

use crate::error::ConnectionError;
use crate::mapping::MetricField;

pub fn build_read_request(
    connection: &dyn PlcConnection,
    fields: &[MetricField],
) -> Result<Box<dyn ReadRequest>, ConnectionError> {
    if !connection.metadata().can_read {
        return Err(ConnectionError::Unsupported {
            url: connection.url().to_string(),
        });
    }

    let mut builder = connection
        .read_request_builder()
        .map_err(|e| ConnectionError::BuildFailed(e.to_string()))?;

    for field in fields {
        debug!("Adding tag '{}' -> '{}'", field.name, field.address);
        builder.add_tag_address(&field.name, &field.address);
    }

    builder
        .build()
        .map_err(|e| ConnectionError::BuildFailed(e.to_string()))
}
