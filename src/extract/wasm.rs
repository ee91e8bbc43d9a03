//! WebAssembly bytecode metrics, extracted by walking the module's section
//! table by hand (spec §4.2 "contract_code" metrics). We don't validate or
//! execute the module - just enough of the binary format to count sections'
//! contents - so this tolerates bytecode a full parser would reject: the
//! metrics fall back to `None` rather than the row being dropped.

const WASM_MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6d];
const WASM_VERSION: [u8; 4] = [0x01, 0x00, 0x00, 0x00];

const SECTION_TYPE: u8 = 1;
const SECTION_IMPORT: u8 = 2;
const SECTION_FUNCTION: u8 = 3;
const SECTION_TABLE: u8 = 4;
const SECTION_GLOBAL: u8 = 6;
const SECTION_EXPORT: u8 = 7;
const SECTION_ELEMENT: u8 = 9;
const SECTION_CODE: u8 = 10;
const SECTION_DATA: u8 = 11;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WasmMetrics {
    pub size_bytes: u32,
    pub n_instructions: Option<u64>,
    pub n_functions: Option<u32>,
    pub n_globals: Option<u32>,
    pub n_table_entries: Option<u32>,
    pub n_types: Option<u32>,
    pub n_data_segments: Option<u32>,
    pub n_elem_segments: Option<u32>,
    pub n_imports: Option<u32>,
    pub n_exports: Option<u32>,
    pub n_data_segment_bytes: Option<u64>,
}

/// Walk `bytes` section by section, tallying the counts spec §4.2 lists.
/// Malformed or truncated input never returns `Err`; it returns whatever
/// metrics were recovered before the parse gave up, with the rest left
/// `None`.
pub fn extract_metrics(bytes: &[u8]) -> WasmMetrics {
    let mut metrics = WasmMetrics {
        size_bytes: bytes.len() as u32,
        ..Default::default()
    };

    if bytes.len() < 8 || bytes[0..4] != WASM_MAGIC || bytes[4..8] != WASM_VERSION {
        return metrics;
    }

    let mut cursor = &bytes[8..];
    let mut code_section: Option<&[u8]> = None;

    while !cursor.is_empty() {
        let Some((section_id, rest)) = read_u8(cursor) else {
            break;
        };
        let mut reader = rest;
        let Ok(section_len) = leb128::read::unsigned(&mut reader) else {
            break;
        };
        let section_len = section_len as usize;
        if section_len > reader.len() {
            break;
        }
        let (section_body, after) = reader.split_at(section_len);
        reader = after;

        match section_id {
            SECTION_TYPE => metrics.n_types = count_vector(section_body),
            SECTION_IMPORT => metrics.n_imports = count_vector(section_body),
            SECTION_FUNCTION => metrics.n_functions = count_vector(section_body),
            SECTION_TABLE => metrics.n_table_entries = count_vector(section_body),
            SECTION_GLOBAL => metrics.n_globals = count_vector(section_body),
            SECTION_EXPORT => metrics.n_exports = count_vector(section_body),
            SECTION_ELEMENT => metrics.n_elem_segments = count_vector(section_body),
            SECTION_DATA => {
                metrics.n_data_segments = count_vector(section_body);
                metrics.n_data_segment_bytes = Some(section_body.len() as u64);
            }
            SECTION_CODE => code_section = Some(section_body),
            _ => {}
        }

        cursor = reader;
    }

    if let Some(code) = code_section {
        let (n_functions, n_instructions) = walk_code_section(code);
        if metrics.n_functions.is_none() {
            metrics.n_functions = n_functions;
        }
        metrics.n_instructions = n_instructions;
    }

    metrics
}

fn read_u8(buf: &[u8]) -> Option<(u8, &[u8])> {
    buf.split_first().map(|(b, rest)| (*b, rest))
}

/// Most sections open with a LEB128 vector-length prefix; that alone gives
/// us the element count without decoding the elements themselves.
fn count_vector(section_body: &[u8]) -> Option<u32> {
    let mut reader = section_body;
    leb128::read::unsigned(&mut reader).ok().map(|n| n as u32)
}

/// The code section is a vector of function bodies; each body is a
/// length-prefixed blob we don't need to decode beyond counting functions
/// and summing a coarse instruction-byte estimate (every byte that isn't
/// part of a local-declaration header is treated as roughly one
/// instruction slot, which is conservative but never panics on opcodes we
/// don't recognize).
fn walk_code_section(code: &[u8]) -> (Option<u32>, Option<u64>) {
    let mut reader = code;
    let Ok(count) = leb128::read::unsigned(&mut reader) else {
        return (None, None);
    };
    let mut total_instruction_bytes: u64 = 0;
    let mut seen = 0u32;
    for _ in 0..count {
        let Ok(body_len) = leb128::read::unsigned(&mut reader) else {
            break;
        };
        let body_len = body_len as usize;
        if body_len > reader.len() {
            break;
        }
        let (body, rest) = reader.split_at(body_len);
        total_instruction_bytes += body.len() as u64;
        reader = rest;
        seen += 1;
    }
    (Some(seen), Some(total_instruction_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leb128_u32(n: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        leb128::write::unsigned(&mut buf, n as u64).unwrap();
        buf
    }

    fn section(id: u8, body: &[u8]) -> Vec<u8> {
        let mut out = vec![id];
        out.extend(leb128_u32(body.len() as u32));
        out.extend_from_slice(body);
        out
    }

    fn minimal_module(sections: &[Vec<u8>]) -> Vec<u8> {
        let mut out = WASM_MAGIC.to_vec();
        out.extend(WASM_VERSION);
        for s in sections {
            out.extend(s);
        }
        out
    }

    #[test]
    fn rejects_missing_magic_without_panicking() {
        let metrics = extract_metrics(b"not wasm");
        assert_eq!(metrics.n_types, None);
        assert_eq!(metrics.size_bytes, 8);
    }

    #[test]
    fn counts_vector_backed_sections() {
        let type_section = section(SECTION_TYPE, &leb128_u32(3));
        let import_section = section(SECTION_IMPORT, &leb128_u32(2));
        let module = minimal_module(&[type_section, import_section]);
        let metrics = extract_metrics(&module);
        assert_eq!(metrics.n_types, Some(3));
        assert_eq!(metrics.n_imports, Some(2));
    }

    #[test]
    fn counts_function_bodies_in_code_section() {
        let mut code_body = leb128_u32(2); // 2 functions
        code_body.extend(section_body_for_function(&[0x00, 0x0b]));
        code_body.extend(section_body_for_function(&[0x01, 0x02, 0x0b]));
        let code_section = section(SECTION_CODE, &code_body);
        let module = minimal_module(&[code_section]);
        let metrics = extract_metrics(&module);
        assert_eq!(metrics.n_functions, Some(2));
        assert!(metrics.n_instructions.unwrap() > 0);
    }

    fn section_body_for_function(body: &[u8]) -> Vec<u8> {
        let mut out = leb128_u32(body.len() as u32);
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn truncated_section_length_stops_cleanly() {
        let mut bytes = WASM_MAGIC.to_vec();
        bytes.extend(WASM_VERSION);
        bytes.push(SECTION_TYPE);
        bytes.extend(leb128_u32(1000)); // claims more bytes than present
        let metrics = extract_metrics(&bytes);
        assert_eq!(metrics.n_types, None);
    }
}
