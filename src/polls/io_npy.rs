// Reading and writing the serialized history in the NumPy .npy format.
//
// Only what the history needs is supported: little-endian f64, C order,
// shape (rows, 7) or (7,). Files written here load with numpy.load.

use std::fs;

use crate::polls::*;

const MAGIC: &[u8] = b"\x93NUMPY";
const DESCR: &str = "<f8";
// Total header size (magic, version, length and dict) is a multiple of this.
const HEADER_ALIGN: usize = 64;

pub fn write_npy(path: &str, data: &Dataset) -> PollsResult<()> {
    let bytes = encode_npy(data);
    fs::write(path, bytes).context(WritingFileSnafu { path })?;
    info!("write_npy: wrote {} polls to {}", data.len(), path);
    Ok(())
}

pub fn read_npy(path: &str) -> PollsResult<Dataset> {
    let bytes = fs::read(path).context(OpeningFileSnafu { path })?;
    let data = decode_npy(path, &bytes)?;
    info!(
        "read_npy: read {} polls from {}",
        data.len(),
        simplify_file_name(path)
    );
    Ok(data)
}

pub fn encode_npy(data: &Dataset) -> Vec<u8> {
    let dict = format!(
        "{{'descr': '{}', 'fortran_order': False, 'shape': ({}, {}), }}",
        DESCR,
        data.len(),
        NUM_COLUMNS
    );
    // magic + 2 version bytes + 2 length bytes + dict + newline
    let unpadded = MAGIC.len() + 4 + dict.len() + 1;
    let padding = (HEADER_ALIGN - unpadded % HEADER_ALIGN) % HEADER_ALIGN;
    let header_len = dict.len() + padding + 1;

    let mut bytes: Vec<u8> = Vec::with_capacity(unpadded + padding + data.len() * NUM_COLUMNS * 8);
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&[1, 0]);
    bytes.extend_from_slice(&(header_len as u16).to_le_bytes());
    bytes.extend_from_slice(dict.as_bytes());
    bytes.extend(std::iter::repeat(b' ').take(padding));
    bytes.push(b'\n');
    for x in data.to_flat() {
        bytes.extend_from_slice(&x.to_le_bytes());
    }
    bytes
}

pub fn decode_npy(path: &str, bytes: &[u8]) -> PollsResult<Dataset> {
    ensure!(
        bytes.len() >= MAGIC.len() + 2 && &bytes[..MAGIC.len()] == MAGIC,
        NpyHeaderSnafu {
            path,
            reason: "missing magic string"
        }
    );
    let major = bytes[MAGIC.len()];
    let (len_size, header_len) = match major {
        1 => (2, read_le(bytes, MAGIC.len() + 2, 2)),
        2 | 3 => (4, read_le(bytes, MAGIC.len() + 2, 4)),
        v => {
            return NpyHeaderSnafu {
                path,
                reason: format!("unsupported format version {}", v),
            }
            .fail()
        }
    };
    let header_len = header_len.context(NpyHeaderSnafu {
        path,
        reason: "truncated header",
    })?;
    let data_start = MAGIC.len() + 2 + len_size + header_len;
    let header_bytes = bytes
        .get(MAGIC.len() + 2 + len_size..data_start)
        .context(NpyHeaderSnafu {
            path,
            reason: "truncated header",
        })?;
    let header = String::from_utf8_lossy(header_bytes);
    debug!("decode_npy: header {:?}", header.trim_end());

    let descr = dict_value(&header, "descr").context(NpyHeaderSnafu {
        path,
        reason: "missing descr",
    })?;
    let descr = descr.trim_matches(|c| c == '\'' || c == '"');
    ensure!(
        descr == DESCR,
        NpyHeaderSnafu {
            path,
            reason: format!("unsupported dtype {}, expected {}", descr, DESCR)
        }
    );

    let fortran_order = dict_value(&header, "fortran_order").context(NpyHeaderSnafu {
        path,
        reason: "missing fortran_order",
    })?;
    ensure!(
        fortran_order == "False",
        NpyHeaderSnafu {
            path,
            reason: "Fortran-ordered arrays are not supported"
        }
    );

    let shape_txt = dict_value(&header, "shape").context(NpyHeaderSnafu {
        path,
        reason: "missing shape",
    })?;
    let shape = parse_shape(shape_txt).context(NpyHeaderSnafu {
        path,
        reason: format!("cannot read shape {}", shape_txt),
    })?;
    let num_rows = match shape.as_slice() {
        [n, c] if *c == NUM_COLUMNS => *n,
        [c] if *c == NUM_COLUMNS => 1,
        // An empty history saved without its second dimension.
        [0] => 0,
        _ => {
            return NpyHeaderSnafu {
                path,
                reason: format!("expected {} columns, found shape {:?}", NUM_COLUMNS, shape),
            }
            .fail()
        }
    };

    let payload = &bytes[data_start..];
    let expected = num_rows
        .checked_mul(NUM_COLUMNS * 8)
        .context(NpyHeaderSnafu {
            path,
            reason: format!("shape {:?} is too large", shape),
        })?;
    ensure!(
        payload.len() >= expected,
        NpyTruncatedSnafu {
            path,
            expected,
            found: payload.len()
        }
    );
    let values: Vec<f64> = payload[..expected]
        .chunks_exact(8)
        .map(|c| {
            let mut b = [0u8; 8];
            b.copy_from_slice(c);
            f64::from_le_bytes(b)
        })
        .collect();
    Dataset::from_flat(&values).context(NpyHeaderSnafu {
        path,
        reason: "payload does not hold whole rows",
    })
}

fn read_le(bytes: &[u8], start: usize, size: usize) -> Option<usize> {
    let b = bytes.get(start..start + size)?;
    Some(
        b.iter()
            .rev()
            .fold(0usize, |acc, byte| (acc << 8) | *byte as usize),
    )
}

// The raw text of a value in the header dict, e.g. `'<f8'`, `False` or `(3, 7)`.
fn dict_value<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    let start = ["'", "\""]
        .iter()
        .find_map(|q| header.find(&format!("{q}{key}{q}")).map(|i| i + key.len() + 2))?;
    let rest = header[start..].trim_start().strip_prefix(':')?.trim_start();
    let end = if rest.starts_with('(') {
        rest.find(')')? + 1
    } else {
        rest.find(|c| c == ',' || c == '}')?
    };
    Some(rest[..end].trim())
}

fn parse_shape(txt: &str) -> Option<Vec<usize>> {
    let inner = txt.strip_prefix('(')?.strip_suffix(')')?;
    inner
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_end_matches('L').parse::<usize>().ok())
        .collect()
}
