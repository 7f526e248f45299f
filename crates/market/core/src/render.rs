use alloy::dyn_abi::DynSolValue;

/// Formats a decoded value for display.
///
/// Addresses are checksummed, integers decimal, bytes hex. Tuples render as `(a, b)` and arrays
/// as `[a, b]`.
#[must_use]
pub fn render(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Bool(b) => b.to_string(),
        DynSolValue::Int(i, _) => i.to_string(),
        DynSolValue::Uint(u, _) => u.to_string(),
        DynSolValue::FixedBytes(word, size) => prefixed(&word[..*size]),
        DynSolValue::Address(address) => address.to_checksum(None),
        DynSolValue::Function(function) => prefixed(function.as_slice()),
        DynSolValue::Bytes(bytes) => prefixed(bytes),
        DynSolValue::String(s) => format!("{s:?}"),
        DynSolValue::Array(values) | DynSolValue::FixedArray(values) => {
            format!("[{}]", join(values))
        }
        DynSolValue::Tuple(values) => format!("({})", join(values)),
        #[allow(unreachable_patterns)]
        other => format!("{other:?}"),
    }
}

/// Renders each value of a call result, one per line.
#[must_use]
pub fn render_all(values: &[DynSolValue]) -> String {
    values.iter().map(render).collect::<Vec<_>>().join("\n")
}

fn prefixed(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

fn join(values: &[DynSolValue]) -> String {
    values.iter().map(render).collect::<Vec<_>>().join(", ")
}
