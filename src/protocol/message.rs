use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

use super::frame;

#[derive(Serialize)]
struct RemoteCall<'a> {
    m: &'a str,
    p: &'a [Value],
}

/// Serialize `{"m": function, "p": params}` compactly and frame it for the wire.
pub fn build(function: &str, params: &[Value]) -> Result<String> {
    let payload = serde_json::to_string(&RemoteCall {
        m: function,
        p: params,
    })?;
    Ok(frame::encode(&payload))
}

#[derive(Serialize)]
struct SymbolDescriptor<'a> {
    symbol: &'a str,
    adjustment: &'a str,
    session: &'a str,
}

/// The `=`-prefixed JSON literal `resolve_symbol` expects as its third parameter.
pub fn symbol_descriptor(symbol: &str, extended_session: bool) -> Result<String> {
    let descriptor = serde_json::to_string(&SymbolDescriptor {
        symbol,
        adjustment: "splits",
        session: if extended_session { "extended" } else { "regular" },
    })?;
    Ok(format!("={descriptor}"))
}
