//! Level 5 MAT-file codec
//!
//! Reads the subset of the MAT-file format the ray tracer exports: numeric
//! arrays, cell arrays and struct arrays, optionally zlib-compressed, in
//! either byte order. Numeric data of any stored integer or float type is
//! widened to `f64`; imaginary parts are dropped. Other array classes are
//! kept as [`MatValue::Unsupported`].
//!
//! Writing produces little-endian files with every variable compressed, the
//! layout MATLAB uses for `save -v7`.

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use ndarray::{Array2, ShapeBuilder};
use nom::bytes::complete::{tag, take};
use nom::branch::alt;
use nom::combinator::{map, value};
use nom::multi::count;
use nom::number::complete as num;
use nom::number::Endianness;
use nom::IResult;
use std::io::{Read, Write};

const HEADER_TEXT_LEN: usize = 116;
const HEADER_LEN: usize = 128;

// Data element types
const MI_INT8: u32 = 1;
const MI_UINT8: u32 = 2;
const MI_INT16: u32 = 3;
const MI_UINT16: u32 = 4;
const MI_INT32: u32 = 5;
const MI_UINT32: u32 = 6;
const MI_SINGLE: u32 = 7;
const MI_DOUBLE: u32 = 9;
const MI_INT64: u32 = 12;
const MI_UINT64: u32 = 13;
const MI_MATRIX: u32 = 14;
const MI_COMPRESSED: u32 = 15;

// Array classes
const MX_CELL: u8 = 1;
const MX_STRUCT: u8 = 2;
const MX_DOUBLE: u8 = 6;
const MX_UINT64: u8 = 15;

/// Length of each NUL-padded struct field name when writing
const FIELD_NAME_LEN: usize = 32;

type Input<'a> = &'a [u8];

/// One MATLAB array
#[derive(Debug, Clone, PartialEq)]
pub enum MatValue {
    /// Numeric or logical array, column-major
    Numeric { dims: Vec<usize>, data: Vec<f64> },
    /// Cell array, column-major
    Cell { dims: Vec<usize>, cells: Vec<MatValue> },
    /// Struct array; `elements[i][f]` is field `f` of element `i`
    Struct {
        dims: Vec<usize>,
        fields: Vec<String>,
        elements: Vec<Vec<MatValue>>,
    },
    /// Array class this codec does not decode; written back as `[]`
    Unsupported { class: u8 },
}

impl MatValue {
    /// Numeric matrix from a 2-D array
    pub fn matrix(array: &Array2<f64>) -> Self {
        let (rows, cols) = array.dim();
        MatValue::Numeric {
            dims: vec![rows, cols],
            data: array.t().iter().copied().collect(),
        }
    }

    /// 1 x n numeric row
    pub fn row(values: &[f64]) -> Self {
        MatValue::Numeric {
            dims: vec![1, values.len()],
            data: values.to_vec(),
        }
    }

    pub fn scalar(value: f64) -> Self {
        Self::row(&[value])
    }

    /// 1 x n cell array
    pub fn cell_row(cells: Vec<MatValue>) -> Self {
        MatValue::Cell {
            dims: vec![1, cells.len()],
            cells,
        }
    }

    /// 1 x 1 struct
    pub fn structure(fields: Vec<(String, MatValue)>) -> Self {
        let (names, values) = fields.into_iter().unzip();
        MatValue::Struct {
            dims: vec![1, 1],
            fields: names,
            elements: vec![values],
        }
    }

    pub fn dims(&self) -> &[usize] {
        match self {
            MatValue::Numeric { dims, .. }
            | MatValue::Cell { dims, .. }
            | MatValue::Struct { dims, .. } => dims,
            MatValue::Unsupported { .. } => &[],
        }
    }

    /// Numeric data in column-major order
    pub fn values(&self) -> Option<&[f64]> {
        match self {
            MatValue::Numeric { data, .. } => Some(data),
            _ => None,
        }
    }

    /// First element of a non-empty numeric array
    pub fn scalar_value(&self) -> Option<f64> {
        self.values().and_then(|data| data.first().copied())
    }

    pub fn cells(&self) -> Option<&[MatValue]> {
        match self {
            MatValue::Cell { cells, .. } => Some(cells),
            _ => None,
        }
    }

    /// Field of the first struct element
    pub fn field(&self, name: &str) -> Option<&MatValue> {
        match self {
            MatValue::Struct {
                fields, elements, ..
            } => {
                let index = fields.iter().position(|f| f == name)?;
                elements.first()?.get(index)
            }
            _ => None,
        }
    }

    /// First field of the first struct element
    pub fn first_field(&self) -> Option<&MatValue> {
        match self {
            MatValue::Struct { elements, .. } => elements.first()?.first(),
            _ => None,
        }
    }

    /// View a numeric array as a matrix
    ///
    /// Trailing singleton dimensions are ignored.
    pub fn to_array2(&self) -> Result<Array2<f64>, String> {
        let (dims, data) = match self {
            MatValue::Numeric { dims, data } => (dims, data),
            other => return Err(format!("expected a numeric array, found {}", other.kind())),
        };

        let (rows, cols) = match dims.as_slice() {
            [] => (0, 0),
            [n] => (*n, 1),
            [rows, cols, rest @ ..] if rest.iter().all(|&d| d == 1) => (*rows, *cols),
            _ => return Err(format!("expected a 2-D array, found dimensions {:?}", dims)),
        };

        Array2::from_shape_vec((rows, cols).f(), data.clone()).map_err(|e| e.to_string())
    }

    fn kind(&self) -> &'static str {
        match self {
            MatValue::Numeric { .. } => "a numeric array",
            MatValue::Cell { .. } => "a cell array",
            MatValue::Struct { .. } => "a struct array",
            MatValue::Unsupported { .. } => "an unsupported array class",
        }
    }
}

/// Named top-level variables of one MAT-file, in file order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatFile {
    variables: Vec<(String, MatValue)>,
}

impl MatFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable, replacing one with the same name
    pub fn insert(&mut self, name: impl Into<String>, value: MatValue) {
        let name = name.into();
        match self.variables.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.variables.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&MatValue> {
        self.variables
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|(name, _)| name.as_str())
    }

    /// Decode a whole file
    pub fn parse(bytes: &[u8]) -> Result<Self, String> {
        let (mut input, endian) = header(bytes).map_err(|e| describe("header", e))?;

        let mut file = Self::new();
        while !input.is_empty() {
            let (rest, element) =
                data_element(input, endian).map_err(|e| describe("variable", e))?;
            if let Some((name, value)) = decode_variable(&element, endian)? {
                file.insert(name, value);
            }
            input = rest;
        }
        Ok(file)
    }

    /// Encode a whole file
    pub fn to_bytes(&self) -> Result<Vec<u8>, String> {
        let mut out = Vec::new();
        write_header(&mut out);

        for (name, value) in &self.variables {
            let mut matrix = Vec::new();
            write_element(&mut matrix, MI_MATRIX, &encode_matrix(name, value));

            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&matrix).map_err(|e| e.to_string())?;
            let compressed = encoder.finish().map_err(|e| e.to_string())?;
            write_element(&mut out, MI_COMPRESSED, &compressed);
        }
        Ok(out)
    }
}

struct Element<'a> {
    data_type: u32,
    data: Input<'a>,
}

fn describe(context: &str, err: nom::Err<nom::error::Error<Input<'_>>>) -> String {
    match err {
        nom::Err::Incomplete(_) => format!("truncated {}", context),
        nom::Err::Error(e) | nom::Err::Failure(e) => format!(
            "malformed {} ({:?} with {} bytes left)",
            context,
            e.code,
            e.input.len()
        ),
    }
}

/// Fixed 128-byte header; the endian indicator decides the byte order
fn header(input: Input<'_>) -> IResult<Input<'_>, Endianness> {
    let (input, _text) = take(HEADER_TEXT_LEN)(input)?;
    let (input, _subsystem_offset) = take(8usize)(input)?;
    let (input, _version) = take(2usize)(input)?;
    alt((
        value(Endianness::Little, tag(&b"IM"[..])),
        value(Endianness::Big, tag(&b"MI"[..])),
    ))(input)
}

/// One tagged data element, in long or small format
fn data_element(input: Input<'_>, endian: Endianness) -> IResult<Input<'_>, Element<'_>> {
    let (rest, first) = num::u32(endian)(input)?;

    // Small format: size in the upper half of the first word, data in the second
    let small_size = (first >> 16) as usize;
    if small_size != 0 {
        let (rest, data) = take(4usize)(rest)?;
        if small_size > 4 {
            return Err(nom::Err::Failure(nom::error::Error::new(
                input,
                nom::error::ErrorKind::LengthValue,
            )));
        }
        return Ok((
            rest,
            Element {
                data_type: first & 0xFFFF,
                data: &data[..small_size],
            },
        ));
    }

    let (rest, num_bytes) = num::u32(endian)(rest)?;
    let (rest, data) = take(num_bytes as usize)(rest)?;

    // Compressed elements are not padded
    let rest = if first == MI_COMPRESSED {
        rest
    } else {
        let padding = (8 - data.len() % 8) % 8;
        &rest[padding.min(rest.len())..]
    };

    Ok((
        rest,
        Element {
            data_type: first,
            data,
        },
    ))
}

/// Decode a top-level element; non-array elements are skipped
fn decode_variable(
    element: &Element<'_>,
    endian: Endianness,
) -> Result<Option<(String, MatValue)>, String> {
    match element.data_type {
        MI_COMPRESSED => {
            let mut inflated = Vec::new();
            ZlibDecoder::new(element.data)
                .read_to_end(&mut inflated)
                .map_err(|e| format!("corrupt compressed variable: {}", e))?;
            let (_, inner) =
                data_element(&inflated, endian).map_err(|e| describe("compressed variable", e))?;
            decode_variable(&inner, endian)
        }
        MI_MATRIX => decode_matrix(element.data, endian).map(Some),
        _ => Ok(None),
    }
}

/// Decode the body of an miMATRIX element into its name and value
fn decode_matrix(data: Input<'_>, endian: Endianness) -> Result<(String, MatValue), String> {
    // Empty cells are stored as miMATRIX elements without a body
    if data.is_empty() {
        return Ok((
            String::new(),
            MatValue::Numeric {
                dims: vec![0, 0],
                data: Vec::new(),
            },
        ));
    }

    let err = |e| describe("array", e);
    let (rest, flags) = data_element(data, endian).map_err(err)?;
    let (_, flag_word) = num::u32::<_, nom::error::Error<Input<'_>>>(endian)(flags.data)
        .map_err(|e| describe("array flags", e))?;
    let class = (flag_word & 0xFF) as u8;

    let (rest, dims_element) = data_element(rest, endian).map_err(err)?;
    let dims = numeric_values(&dims_element, endian)?
        .into_iter()
        .map(|d| {
            if d >= 0.0 {
                Ok(d as usize)
            } else {
                Err(format!("negative array dimension {}", d))
            }
        })
        .collect::<Result<Vec<usize>, String>>()?;
    let len: usize = dims.iter().product();

    let (mut rest, name_element) = data_element(rest, endian).map_err(err)?;
    let name = nul_trimmed(name_element.data);

    let value = match class {
        MX_CELL => {
            let mut cells = Vec::with_capacity(len);
            for _ in 0..len {
                let (next, element) = data_element(rest, endian).map_err(err)?;
                cells.push(nested_matrix(&element, endian)?);
                rest = next;
            }
            MatValue::Cell { dims, cells }
        }
        MX_STRUCT => {
            let (next, name_len) = data_element(rest, endian).map_err(err)?;
            let name_len = numeric_values(&name_len, endian)?
                .first()
                .map(|&n| n as usize)
                .filter(|&n| n > 0)
                .ok_or_else(|| "struct without a field name length".to_string())?;
            let (next, names) = data_element(next, endian).map_err(err)?;
            let fields: Vec<String> = names.data.chunks(name_len).map(nul_trimmed).collect();

            rest = next;
            let mut elements = Vec::with_capacity(len);
            for _ in 0..len {
                let mut values = Vec::with_capacity(fields.len());
                for _ in 0..fields.len() {
                    let (next, element) = data_element(rest, endian).map_err(err)?;
                    values.push(nested_matrix(&element, endian)?);
                    rest = next;
                }
                elements.push(values);
            }
            MatValue::Struct {
                dims,
                fields,
                elements,
            }
        }
        MX_DOUBLE..=MX_UINT64 => {
            let (_, real) = data_element(rest, endian).map_err(err)?;
            let data = numeric_values(&real, endian)?;
            if data.len() != len {
                return Err(format!(
                    "array '{}' holds {} values for dimensions {:?}",
                    name,
                    data.len(),
                    dims
                ));
            }
            MatValue::Numeric { dims, data }
        }
        class => MatValue::Unsupported { class },
    };

    Ok((name, value))
}

fn nested_matrix(element: &Element<'_>, endian: Endianness) -> Result<MatValue, String> {
    if element.data_type != MI_MATRIX {
        return Err(format!(
            "expected a nested array, found data type {}",
            element.data_type
        ));
    }
    decode_matrix(element.data, endian).map(|(_, value)| value)
}

/// Widen the payload of a numeric data element to `f64`
fn numeric_values(element: &Element<'_>, endian: Endianness) -> Result<Vec<f64>, String> {
    let data = element.data;
    let parsed: IResult<Input<'_>, Vec<f64>> = match element.data_type {
        MI_INT8 => count(map(num::i8, f64::from), data.len())(data),
        MI_UINT8 => count(map(num::u8, f64::from), data.len())(data),
        MI_INT16 => count(map(num::i16(endian), f64::from), data.len() / 2)(data),
        MI_UINT16 => count(map(num::u16(endian), f64::from), data.len() / 2)(data),
        MI_INT32 => count(map(num::i32(endian), f64::from), data.len() / 4)(data),
        MI_UINT32 => count(map(num::u32(endian), f64::from), data.len() / 4)(data),
        MI_SINGLE => count(map(num::f32(endian), f64::from), data.len() / 4)(data),
        MI_DOUBLE => count(num::f64(endian), data.len() / 8)(data),
        MI_INT64 => count(map(num::i64(endian), |v| v as f64), data.len() / 8)(data),
        MI_UINT64 => count(map(num::u64(endian), |v| v as f64), data.len() / 8)(data),
        other => return Err(format!("data type {} is not numeric", other)),
    };
    parsed
        .map(|(_, values)| values)
        .map_err(|e| describe("numeric data", e))
}

fn nul_trimmed(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn write_header(out: &mut Vec<u8>) {
    let mut text = format!(
        "MATLAB 5.0 MAT-file, Platform: {}, Created by: raytrace",
        std::env::consts::OS
    )
    .into_bytes();
    text.resize(HEADER_TEXT_LEN, b' ');
    out.extend_from_slice(&text);
    out.extend_from_slice(&[0u8; 8]);
    out.extend_from_slice(&0x0100u16.to_le_bytes());
    out.extend_from_slice(b"IM");
    debug_assert_eq!(out.len(), HEADER_LEN);
}

/// Append a little-endian data element, small format when it fits
fn write_element(out: &mut Vec<u8>, data_type: u32, data: &[u8]) {
    let small = !data.is_empty()
        && data.len() <= 4
        && data_type != MI_MATRIX
        && data_type != MI_COMPRESSED;
    if small {
        out.extend_from_slice(&(((data.len() as u32) << 16) | data_type).to_le_bytes());
        out.extend_from_slice(data);
        out.resize(out.len() + 4 - data.len(), 0);
        return;
    }

    out.extend_from_slice(&data_type.to_le_bytes());
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
    if data_type != MI_COMPRESSED {
        out.resize(out.len() + (8 - data.len() % 8) % 8, 0);
    }
}

/// Body of an miMATRIX element
fn encode_matrix(name: &str, value: &MatValue) -> Vec<u8> {
    let class = match value {
        MatValue::Cell { .. } => MX_CELL,
        MatValue::Struct { .. } => MX_STRUCT,
        MatValue::Numeric { .. } | MatValue::Unsupported { .. } => MX_DOUBLE,
    };
    let dims: &[usize] = match value {
        MatValue::Unsupported { .. } => &[0, 0],
        other => other.dims(),
    };

    let mut body = Vec::new();
    let mut flags = Vec::with_capacity(8);
    flags.extend_from_slice(&u32::from(class).to_le_bytes());
    flags.extend_from_slice(&0u32.to_le_bytes());
    write_element(&mut body, MI_UINT32, &flags);

    let dim_bytes: Vec<u8> = dims
        .iter()
        .flat_map(|&d| (d as i32).to_le_bytes())
        .collect();
    write_element(&mut body, MI_INT32, &dim_bytes);
    write_element(&mut body, MI_INT8, name.as_bytes());

    match value {
        MatValue::Numeric { data, .. } => {
            let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
            write_element(&mut body, MI_DOUBLE, &bytes);
        }
        MatValue::Unsupported { .. } => write_element(&mut body, MI_DOUBLE, &[]),
        MatValue::Cell { cells, .. } => {
            for cell in cells {
                write_element(&mut body, MI_MATRIX, &encode_matrix("", cell));
            }
        }
        MatValue::Struct {
            fields, elements, ..
        } => {
            let name_len = fields
                .iter()
                .map(|f| f.len() + 1)
                .max()
                .unwrap_or(1)
                .max(FIELD_NAME_LEN);
            write_element(&mut body, MI_INT32, &(name_len as i32).to_le_bytes());

            let mut names = Vec::with_capacity(name_len * fields.len());
            for field in fields {
                let start = names.len();
                names.extend_from_slice(field.as_bytes());
                names.resize(start + name_len, 0);
            }
            write_element(&mut body, MI_INT8, &names);

            for element in elements {
                for field in element {
                    write_element(&mut body, MI_MATRIX, &encode_matrix("", field));
                }
            }
        }
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn header_bytes(indicator: &[u8; 2]) -> Vec<u8> {
        let mut out = vec![b' '; HEADER_TEXT_LEN];
        out.extend_from_slice(&[0u8; 8]);
        out.extend_from_slice(&[0x01, 0x00]);
        out.extend_from_slice(indicator);
        out
    }

    fn be_element(out: &mut Vec<u8>, data_type: u32, data: &[u8]) {
        out.extend_from_slice(&data_type.to_be_bytes());
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        out.extend_from_slice(data);
        out.resize(out.len() + (8 - data.len() % 8) % 8, 0);
    }

    /// `x = [1 2 3; 4 5 6]` as written by MATLAB on a little-endian host,
    /// with the doubles stored as miUINT8 and the name in small format
    fn matlab_style_file() -> Vec<u8> {
        let mut body = Vec::new();
        // Array flags: mxDOUBLE_CLASS
        body.extend_from_slice(&MI_UINT32.to_le_bytes());
        body.extend_from_slice(&8u32.to_le_bytes());
        body.extend_from_slice(&[6, 0, 0, 0, 0, 0, 0, 0]);
        // Dimensions 2 x 3
        body.extend_from_slice(&MI_INT32.to_le_bytes());
        body.extend_from_slice(&8u32.to_le_bytes());
        body.extend_from_slice(&2i32.to_le_bytes());
        body.extend_from_slice(&3i32.to_le_bytes());
        // Name "x", small data element
        body.extend_from_slice(&((1u32 << 16) | MI_INT8).to_le_bytes());
        body.extend_from_slice(&[b'x', 0, 0, 0]);
        // Column-major values, small format does not fit six bytes
        body.extend_from_slice(&MI_UINT8.to_le_bytes());
        body.extend_from_slice(&6u32.to_le_bytes());
        body.extend_from_slice(&[1, 4, 2, 5, 3, 6, 0, 0]);

        let mut matrix = Vec::new();
        matrix.extend_from_slice(&MI_MATRIX.to_le_bytes());
        matrix.extend_from_slice(&(body.len() as u32).to_le_bytes());
        matrix.extend_from_slice(&body);

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&matrix).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut out = header_bytes(b"IM");
        out.extend_from_slice(&MI_COMPRESSED.to_le_bytes());
        out.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
        out.extend_from_slice(&compressed);
        out
    }

    #[test]
    fn test_parse_compressed_matrix() {
        let file = MatFile::parse(&matlab_style_file()).unwrap();
        let x = file.get("x").unwrap();
        assert_eq!(x.dims(), &[2, 3]);
        assert_eq!(x.to_array2().unwrap(), array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    }

    #[test]
    fn test_parse_big_endian_uncompressed() {
        let mut body = Vec::new();
        be_element(&mut body, MI_UINT32, &[0, 0, 0, MX_DOUBLE, 0, 0, 0, 0]);
        be_element(&mut body, MI_INT32, &[0, 0, 0, 1, 0, 0, 0, 2]);
        be_element(&mut body, MI_INT8, b"fc");
        let values: Vec<u8> = [28e9f64, -1.5].iter().flat_map(|v| v.to_be_bytes()).collect();
        be_element(&mut body, MI_DOUBLE, &values);

        let mut out = header_bytes(b"MI");
        be_element(&mut out, MI_MATRIX, &body);

        let file = MatFile::parse(&out).unwrap();
        assert_eq!(file.get("fc").unwrap().values().unwrap(), &[28e9, -1.5]);
    }

    #[test]
    fn test_cells_and_structs() {
        let paths = array![[0.5, 1.0], [1e-7, 2e-7], [-80.0, -90.0]];
        let mut file = MatFile::new();
        file.insert(
            "channels",
            MatValue::cell_row(vec![
                MatValue::structure(vec![("p".to_string(), MatValue::matrix(&paths))]),
                MatValue::structure(vec![(
                    "p".to_string(),
                    MatValue::matrix(&Array2::zeros((8, 0))),
                )]),
            ]),
        );
        file.insert("tx_loc", MatValue::row(&[1.0, 2.0, 3.0]));

        let parsed = MatFile::parse(&file.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed.names().collect::<Vec<_>>(), vec!["channels", "tx_loc"]);

        let cells = parsed.get("channels").unwrap().cells().unwrap();
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].field("p").unwrap().to_array2().unwrap(), paths);
        assert_eq!(cells[1].first_field().unwrap().dims(), &[8, 0]);
        assert_eq!(parsed.get("tx_loc").unwrap().scalar_value(), Some(1.0));
    }

    #[test]
    fn test_empty_cell_entry() {
        // A cell holding [] is an miMATRIX element without a body
        let mut body = Vec::new();
        write_element(&mut body, MI_UINT32, &[MX_CELL, 0, 0, 0, 0, 0, 0, 0]);
        let dims: Vec<u8> = [1i32, 1].iter().flat_map(|d| d.to_le_bytes()).collect();
        write_element(&mut body, MI_INT32, &dims);
        write_element(&mut body, MI_INT8, b"c");
        write_element(&mut body, MI_MATRIX, &[]);

        let mut out = header_bytes(b"IM");
        write_element(&mut out, MI_MATRIX, &body);

        let file = MatFile::parse(&out).unwrap();
        let cells = file.get("c").unwrap().cells().unwrap();
        assert_eq!(cells[0].to_array2().unwrap().dim(), (0, 0));
    }

    #[test]
    fn test_rejects_non_mat_bytes() {
        assert!(MatFile::parse(b"not a mat file").is_err());

        let mut bad = header_bytes(b"XX");
        bad.extend_from_slice(&[0; 16]);
        assert!(MatFile::parse(&bad).is_err());

        // Element claiming more bytes than the file holds
        let mut truncated = header_bytes(b"IM");
        truncated.extend_from_slice(&MI_MATRIX.to_le_bytes());
        truncated.extend_from_slice(&1000u32.to_le_bytes());
        let err = MatFile::parse(&truncated).unwrap_err();
        assert!(err.contains("variable"));
    }

    #[test]
    fn test_to_array2_dimensions() {
        let value = MatValue::Numeric {
            dims: vec![2, 1, 1],
            data: vec![3.0, 4.0],
        };
        assert_eq!(value.to_array2().unwrap(), array![[3.0], [4.0]]);

        let cube = MatValue::Numeric {
            dims: vec![1, 2, 2],
            data: vec![0.0; 4],
        };
        assert!(cube.to_array2().is_err());
        assert!(MatValue::cell_row(vec![]).to_array2().is_err());
    }
}
