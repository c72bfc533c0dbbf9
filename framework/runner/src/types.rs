/// Recommended error type for the suite binary and the glue that wires a suite together.
pub type GatewayTunnelResult<T> = anyhow::Result<T>;
