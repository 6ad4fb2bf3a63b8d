//! Solidity ABI marshaling for contract calls and event logs.
//!
//! Covers the value types FHEVM contracts use at their boundary: unsigned
//! and signed integers, `bool`, `address`, `bytesN`, dynamic `bytes` and
//! `string`, and dynamic arrays of those. Tuples are not supported.
//!
//! ABIs load from either human-readable fragments or JSON ABI objects.

use std::fmt;

use num_bigint::{BigInt, BigUint, Sign};
use serde_json::Value;

use crate::error::FhevmError;
use crate::keccak::keccak256;
use crate::types::Log;
use crate::validation::{is_valid_address, parse_unsigned};

const WORD: usize = 32;

fn abi_error(message: impl Into<String>) -> FhevmError {
    FhevmError::Abi(message.into())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamType {
    Uint(usize),
    Int(usize),
    Bool,
    Address,
    FixedBytes(usize),
    Bytes,
    String,
    Array(Box<ParamType>),
}

impl ParamType {
    pub fn parse(text: &str) -> Result<Self, FhevmError> {
        let text = text.trim();
        if let Some(inner) = text.strip_suffix("[]") {
            return Ok(ParamType::Array(Box::new(Self::parse(inner)?)));
        }
        if text.ends_with(']') {
            return Err(abi_error(format!("fixed-size arrays are not supported: {text}")));
        }

        let sized = |prefix: &str, default: usize| -> Option<Result<usize, FhevmError>> {
            let rest = text.strip_prefix(prefix)?;
            if rest.is_empty() {
                return Some(Ok(default));
            }
            Some(
                rest.parse::<usize>()
                    .map_err(|_| abi_error(format!("invalid type: {text}"))),
            )
        };

        match text {
            "bool" => return Ok(ParamType::Bool),
            "address" => return Ok(ParamType::Address),
            "string" => return Ok(ParamType::String),
            "bytes" => return Ok(ParamType::Bytes),
            _ => {}
        }

        if let Some(bits) = sized("uint", 256) {
            let bits = bits?;
            if bits == 0 || bits > 256 || bits % 8 != 0 {
                return Err(abi_error(format!("invalid integer width: {text}")));
            }
            return Ok(ParamType::Uint(bits));
        }
        if let Some(bits) = sized("int", 256) {
            let bits = bits?;
            if bits == 0 || bits > 256 || bits % 8 != 0 {
                return Err(abi_error(format!("invalid integer width: {text}")));
            }
            return Ok(ParamType::Int(bits));
        }
        if let Some(size) = text.strip_prefix("bytes") {
            let size: usize = size
                .parse()
                .map_err(|_| abi_error(format!("invalid type: {text}")))?;
            if size == 0 || size > 32 {
                return Err(abi_error(format!("invalid bytes width: {text}")));
            }
            return Ok(ParamType::FixedBytes(size));
        }

        Err(abi_error(format!("unsupported type: {text}")))
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(
            self,
            ParamType::Bytes | ParamType::String | ParamType::Array(_)
        )
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Uint(bits) => write!(f, "uint{bits}"),
            ParamType::Int(bits) => write!(f, "int{bits}"),
            ParamType::Bool => f.write_str("bool"),
            ParamType::Address => f.write_str("address"),
            ParamType::FixedBytes(size) => write!(f, "bytes{size}"),
            ParamType::Bytes => f.write_str("bytes"),
            ParamType::String => f.write_str("string"),
            ParamType::Array(inner) => write!(f, "{inner}[]"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AbiValue {
    Uint(BigUint),
    Int(BigInt),
    Bool(bool),
    Address([u8; 20]),
    FixedBytes(Vec<u8>),
    Bytes(Vec<u8>),
    String(String),
    Array(Vec<AbiValue>),
}

fn parse_hex_bytes(text: &str) -> Result<Vec<u8>, FhevmError> {
    let digits = text
        .strip_prefix("0x")
        .ok_or_else(|| abi_error(format!("expected 0x-prefixed hex, got {text}")))?;
    hex::decode(digits).map_err(|error| abi_error(format!("invalid hex {text}: {error}")))
}

fn parse_signed(value: &Value) -> Option<BigInt> {
    match value {
        Value::Number(number) => number.as_i64().map(BigInt::from),
        Value::String(text) => {
            let text = text.trim();
            match text.strip_prefix('-') {
                Some(rest) => parse_unsigned(&Value::String(rest.to_string()))
                    .map(|magnitude| -BigInt::from(magnitude)),
                None => parse_unsigned(&Value::String(text.to_string())).map(BigInt::from),
            }
        }
        _ => None,
    }
}

impl AbiValue {
    /// Coerce a JSON argument into a value of `kind`.
    pub fn from_json(kind: &ParamType, value: &Value) -> Result<Self, FhevmError> {
        let invalid = || abi_error(format!("cannot encode {value} as {kind}"));
        match kind {
            ParamType::Uint(bits) => {
                let number = parse_unsigned(value).ok_or_else(invalid)?;
                if number.bits() > *bits as u64 {
                    return Err(abi_error(format!("{number} overflows {kind}")));
                }
                Ok(AbiValue::Uint(number))
            }
            ParamType::Int(bits) => {
                let number = parse_signed(value).ok_or_else(invalid)?;
                let limit = BigInt::from(1u8) << (*bits - 1);
                if number >= limit || number < -limit {
                    return Err(abi_error(format!("{number} overflows {kind}")));
                }
                Ok(AbiValue::Int(number))
            }
            ParamType::Bool => value.as_bool().map(AbiValue::Bool).ok_or_else(invalid),
            ParamType::Address => {
                let text = value.as_str().filter(|text| is_valid_address(text)).ok_or_else(invalid)?;
                let bytes = parse_hex_bytes(text)?;
                let mut address = [0u8; 20];
                address.copy_from_slice(&bytes);
                Ok(AbiValue::Address(address))
            }
            ParamType::FixedBytes(size) => {
                let bytes = parse_hex_bytes(value.as_str().ok_or_else(invalid)?)?;
                if bytes.len() != *size {
                    return Err(abi_error(format!(
                        "expected {size} bytes for {kind}, got {}",
                        bytes.len()
                    )));
                }
                Ok(AbiValue::FixedBytes(bytes))
            }
            ParamType::Bytes => Ok(AbiValue::Bytes(parse_hex_bytes(
                value.as_str().ok_or_else(invalid)?,
            )?)),
            ParamType::String => value
                .as_str()
                .map(|text| AbiValue::String(text.to_string()))
                .ok_or_else(invalid),
            ParamType::Array(inner) => {
                let items = value.as_array().ok_or_else(invalid)?;
                items
                    .iter()
                    .map(|item| Self::from_json(inner, item))
                    .collect::<Result<Vec<_>, _>>()
                    .map(AbiValue::Array)
            }
        }
    }

    /// JSON rendering; integers become decimal strings.
    pub fn to_json(&self) -> Value {
        match self {
            AbiValue::Uint(number) => Value::String(number.to_string()),
            AbiValue::Int(number) => Value::String(number.to_string()),
            AbiValue::Bool(flag) => Value::Bool(*flag),
            AbiValue::Address(bytes) => Value::String(format!("0x{}", hex::encode(bytes))),
            AbiValue::FixedBytes(bytes) | AbiValue::Bytes(bytes) => {
                Value::String(format!("0x{}", hex::encode(bytes)))
            }
            AbiValue::String(text) => Value::String(text.clone()),
            AbiValue::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
        }
    }

    pub fn as_uint(&self) -> Option<&BigUint> {
        match self {
            AbiValue::Uint(number) => Some(number),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AbiValue::Bool(flag) => Some(*flag),
            _ => None,
        }
    }
}

fn uint_word(number: &BigUint) -> Result<[u8; WORD], FhevmError> {
    let bytes = number.to_bytes_be();
    if bytes.len() > WORD {
        return Err(abi_error(format!("{number} does not fit in a word")));
    }
    let mut word = [0u8; WORD];
    word[WORD - bytes.len()..].copy_from_slice(&bytes);
    Ok(word)
}

fn int_word(number: &BigInt) -> Result<[u8; WORD], FhevmError> {
    let modulus = BigInt::from(1u8) << 256;
    let wrapped = if number.sign() == Sign::Minus {
        &modulus + number
    } else {
        number.clone()
    };
    let magnitude = wrapped
        .to_biguint()
        .ok_or_else(|| abi_error(format!("{number} does not fit in a word")))?;
    uint_word(&magnitude)
}

fn usize_word(value: usize) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&(value as u64).to_be_bytes());
    word
}

fn padded(bytes: &[u8]) -> Vec<u8> {
    let mut out = usize_word(bytes.len()).to_vec();
    out.extend_from_slice(bytes);
    let remainder = bytes.len() % WORD;
    if remainder != 0 {
        out.resize(out.len() + WORD - remainder, 0);
    }
    out
}

fn check_kind(kind: &ParamType, value: &AbiValue) -> Result<(), FhevmError> {
    let matches = matches!(
        (kind, value),
        (ParamType::Uint(_), AbiValue::Uint(_))
            | (ParamType::Int(_), AbiValue::Int(_))
            | (ParamType::Bool, AbiValue::Bool(_))
            | (ParamType::Address, AbiValue::Address(_))
            | (ParamType::FixedBytes(_), AbiValue::FixedBytes(_))
            | (ParamType::Bytes, AbiValue::Bytes(_))
            | (ParamType::String, AbiValue::String(_))
            | (ParamType::Array(_), AbiValue::Array(_))
    );
    if matches {
        Ok(())
    } else {
        Err(abi_error(format!("value {value:?} does not match {kind}")))
    }
}

fn encode_single(kind: &ParamType, value: &AbiValue) -> Result<Vec<u8>, FhevmError> {
    check_kind(kind, value)?;
    let encoded = match (kind, value) {
        (ParamType::Uint(_), AbiValue::Uint(number)) => uint_word(number)?.to_vec(),
        (ParamType::Int(_), AbiValue::Int(number)) => int_word(number)?.to_vec(),
        (ParamType::Bool, AbiValue::Bool(flag)) => usize_word(usize::from(*flag)).to_vec(),
        (ParamType::Address, AbiValue::Address(bytes)) => {
            let mut word = [0u8; WORD];
            word[12..].copy_from_slice(bytes);
            word.to_vec()
        }
        (ParamType::FixedBytes(size), AbiValue::FixedBytes(bytes)) => {
            if bytes.len() != *size {
                return Err(abi_error(format!(
                    "expected {size} bytes for {kind}, got {}",
                    bytes.len()
                )));
            }
            let mut word = [0u8; WORD];
            word[..bytes.len()].copy_from_slice(bytes);
            word.to_vec()
        }
        (ParamType::Bytes, AbiValue::Bytes(bytes)) => padded(bytes),
        (ParamType::String, AbiValue::String(text)) => padded(text.as_bytes()),
        (ParamType::Array(inner), AbiValue::Array(items)) => {
            let kinds = vec![(**inner).clone(); items.len()];
            let mut out = usize_word(items.len()).to_vec();
            out.extend(encode(&kinds, items)?);
            out
        }
        _ => return Err(abi_error(format!("value {value:?} does not match {kind}"))),
    };
    Ok(encoded)
}

/// Encode a tuple of values with head/tail layout.
pub fn encode(kinds: &[ParamType], values: &[AbiValue]) -> Result<Vec<u8>, FhevmError> {
    if kinds.len() != values.len() {
        return Err(abi_error(format!(
            "expected {} arguments, got {}",
            kinds.len(),
            values.len()
        )));
    }

    let head_size = kinds.len() * WORD;
    let mut head = Vec::with_capacity(head_size);
    let mut tail = Vec::new();

    for (kind, value) in kinds.iter().zip(values) {
        let encoded = encode_single(kind, value)?;
        if kind.is_dynamic() {
            head.extend_from_slice(&usize_word(head_size + tail.len()));
            tail.extend(encoded);
        } else {
            head.extend(encoded);
        }
    }

    head.extend(tail);
    Ok(head)
}

fn read_word(data: &[u8], offset: usize) -> Result<&[u8], FhevmError> {
    offset
        .checked_add(WORD)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| abi_error(format!("data too short: need word at {offset}")))
}

fn read_usize(data: &[u8], offset: usize) -> Result<usize, FhevmError> {
    let word = read_word(data, offset)?;
    if word[..WORD - 8].iter().any(|byte| *byte != 0) {
        return Err(abi_error("length or offset out of range"));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[WORD - 8..]);
    usize::try_from(u64::from_be_bytes(buf)).map_err(|_| abi_error("length or offset out of range"))
}

fn decode_static_word(kind: &ParamType, word: &[u8]) -> Result<AbiValue, FhevmError> {
    match kind {
        ParamType::Uint(_) => Ok(AbiValue::Uint(BigUint::from_bytes_be(word))),
        ParamType::Int(_) => {
            let raw = BigInt::from_bytes_be(Sign::Plus, word);
            let value = if word[0] & 0x80 != 0 {
                raw - (BigInt::from(1u8) << 256)
            } else {
                raw
            };
            Ok(AbiValue::Int(value))
        }
        ParamType::Bool => match word.iter().rposition(|byte| *byte != 0) {
            None => Ok(AbiValue::Bool(false)),
            Some(index) if index == WORD - 1 && word[index] == 1 => Ok(AbiValue::Bool(true)),
            Some(_) => Err(abi_error("invalid bool encoding")),
        },
        ParamType::Address => {
            let mut address = [0u8; 20];
            address.copy_from_slice(&word[12..]);
            Ok(AbiValue::Address(address))
        }
        ParamType::FixedBytes(size) => Ok(AbiValue::FixedBytes(word[..*size].to_vec())),
        _ => Err(abi_error(format!("{kind} is not a static type"))),
    }
}

fn decode_single(kind: &ParamType, data: &[u8]) -> Result<AbiValue, FhevmError> {
    match kind {
        ParamType::Bytes | ParamType::String => {
            let len = read_usize(data, 0)?;
            let bytes = WORD
                .checked_add(len)
                .and_then(|end| data.get(WORD..end))
                .ok_or_else(|| abi_error("data too short for dynamic bytes"))?
                .to_vec();
            if matches!(kind, ParamType::String) {
                String::from_utf8(bytes)
                    .map(AbiValue::String)
                    .map_err(|error| abi_error(format!("invalid utf-8 string: {error}")))
            } else {
                Ok(AbiValue::Bytes(bytes))
            }
        }
        ParamType::Array(inner) => {
            let len = read_usize(data, 0)?;
            let body = data
                .get(WORD..)
                .ok_or_else(|| abi_error("data too short for array"))?;
            if len > body.len() / WORD {
                return Err(abi_error("array length exceeds data"));
            }
            let kinds = vec![(**inner).clone(); len];
            decode(&kinds, body).map(AbiValue::Array)
        }
        static_kind => decode_static_word(static_kind, read_word(data, 0)?),
    }
}

/// Decode a head/tail encoded tuple.
pub fn decode(kinds: &[ParamType], data: &[u8]) -> Result<Vec<AbiValue>, FhevmError> {
    kinds
        .iter()
        .enumerate()
        .map(|(index, kind)| {
            let head = index * WORD;
            if kind.is_dynamic() {
                let offset = read_usize(data, head)?;
                let tail = data
                    .get(offset..)
                    .ok_or_else(|| abi_error(format!("offset {offset} out of range")))?;
                decode_single(kind, tail)
            } else {
                decode_static_word(kind, read_word(data, head)?)
            }
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub kind: ParamType,
    pub indexed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateMutability {
    Pure,
    View,
    NonPayable,
    Payable,
}

impl StateMutability {
    fn parse(text: &str) -> Option<Self> {
        match text {
            "pure" => Some(Self::Pure),
            "view" => Some(Self::View),
            "nonpayable" => Some(Self::NonPayable),
            "payable" => Some(Self::Payable),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub inputs: Vec<Param>,
    pub outputs: Vec<Param>,
    pub state_mutability: StateMutability,
}

fn signature_of(name: &str, params: &[Param]) -> String {
    let kinds: Vec<String> = params.iter().map(|param| param.kind.to_string()).collect();
    format!("{name}({})", kinds.join(","))
}

fn kinds_of(params: &[Param]) -> Vec<ParamType> {
    params.iter().map(|param| param.kind.clone()).collect()
}

impl Function {
    pub fn signature(&self) -> String {
        signature_of(&self.name, &self.inputs)
    }

    pub fn selector(&self) -> [u8; 4] {
        let digest = keccak256(self.signature().as_bytes());
        [digest[0], digest[1], digest[2], digest[3]]
    }

    pub fn is_read_only(&self) -> bool {
        matches!(
            self.state_mutability,
            StateMutability::View | StateMutability::Pure
        )
    }

    pub fn encode_call(&self, args: &[AbiValue]) -> Result<Vec<u8>, FhevmError> {
        let mut calldata = self.selector().to_vec();
        calldata.extend(encode(&kinds_of(&self.inputs), args)?);
        Ok(calldata)
    }

    /// Coerce JSON arguments against the input types, then encode.
    pub fn encode_json_call(&self, args: &[Value]) -> Result<Vec<u8>, FhevmError> {
        if args.len() != self.inputs.len() {
            return Err(abi_error(format!(
                "{} expects {} arguments, got {}",
                self.signature(),
                self.inputs.len(),
                args.len()
            )));
        }
        let values = self
            .inputs
            .iter()
            .zip(args)
            .map(|(param, arg)| AbiValue::from_json(&param.kind, arg))
            .collect::<Result<Vec<_>, _>>()?;
        self.encode_call(&values)
    }

    pub fn decode_output(&self, data: &[u8]) -> Result<Vec<AbiValue>, FhevmError> {
        decode(&kinds_of(&self.outputs), data)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub name: String,
    pub inputs: Vec<Param>,
    pub anonymous: bool,
}

impl Event {
    pub fn signature(&self) -> String {
        signature_of(&self.name, &self.inputs)
    }

    pub fn topic(&self) -> [u8; 32] {
        keccak256(self.signature().as_bytes())
    }

    pub fn topic_hex(&self) -> String {
        format!("0x{}", hex::encode(self.topic()))
    }

    /// Decode a log emitted by this event into named values, in declaration
    /// order. Indexed dynamic values come back as their 32-byte topic hash.
    pub fn decode_log(&self, log: &Log) -> Result<Vec<(String, AbiValue)>, FhevmError> {
        let mut topics = log.topics.iter();
        if !self.anonymous {
            let first = topics
                .next()
                .ok_or_else(|| abi_error(format!("log for {} has no topics", self.name)))?;
            if !first.eq_ignore_ascii_case(&self.topic_hex()) {
                return Err(abi_error(format!("log topic does not match {}", self.signature())));
            }
        }

        let data = parse_hex_bytes(&log.data)?;
        let data_kinds: Vec<ParamType> = self
            .inputs
            .iter()
            .filter(|param| !param.indexed)
            .map(|param| param.kind.clone())
            .collect();
        let mut data_values = decode(&data_kinds, &data)?.into_iter();

        self.inputs
            .iter()
            .map(|param| {
                let value = if param.indexed {
                    let topic = topics.next().ok_or_else(|| {
                        abi_error(format!("missing topic for indexed {}", param.name))
                    })?;
                    let word = parse_hex_bytes(topic)?;
                    if word.len() != WORD {
                        return Err(abi_error("topic must be 32 bytes"));
                    }
                    if param.kind.is_dynamic() {
                        AbiValue::FixedBytes(word)
                    } else {
                        decode_static_word(&param.kind, &word)?
                    }
                } else {
                    data_values
                        .next()
                        .ok_or_else(|| abi_error(format!("missing data for {}", param.name)))?
                };
                Ok((param.name.clone(), value))
            })
            .collect()
    }
}

/// Parsed contract interface.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Abi {
    pub functions: Vec<Function>,
    pub events: Vec<Event>,
}

fn split_params(list: &str) -> Vec<&str> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .collect()
}

fn parse_human_param(text: &str, index: usize) -> Result<Param, FhevmError> {
    let mut tokens = text.split_whitespace();
    let kind = ParamType::parse(
        tokens
            .next()
            .ok_or_else(|| abi_error(format!("empty parameter in {text}")))?,
    )?;
    let mut indexed = false;
    let mut name = None;
    for token in tokens {
        match token {
            "indexed" => indexed = true,
            "memory" | "calldata" | "storage" => {}
            other => name = Some(other.to_string()),
        }
    }
    Ok(Param {
        name: name.unwrap_or_else(|| format!("arg{index}")),
        kind,
        indexed,
    })
}

fn parse_param_list(list: &str) -> Result<Vec<Param>, FhevmError> {
    split_params(list)
        .into_iter()
        .enumerate()
        .map(|(index, item)| parse_human_param(item, index))
        .collect()
}

/// Split `name(params) rest` into its three parts.
fn split_fragment(body: &str) -> Result<(&str, &str, &str), FhevmError> {
    let open = body
        .find('(')
        .ok_or_else(|| abi_error(format!("missing parameter list in {body}")))?;
    let close = body[open..]
        .find(')')
        .map(|offset| open + offset)
        .ok_or_else(|| abi_error(format!("unterminated parameter list in {body}")))?;
    if body[open + 1..close].contains('(') {
        return Err(abi_error(format!("tuple parameters are not supported: {body}")));
    }
    Ok((
        body[..open].trim(),
        &body[open + 1..close],
        body[close + 1..].trim(),
    ))
}

impl Abi {
    /// Load from a JSON array of human-readable strings and/or ABI objects.
    pub fn from_json(value: &Value) -> Result<Self, FhevmError> {
        let items = value
            .as_array()
            .ok_or_else(|| abi_error("ABI must be a JSON array"))?;
        let mut abi = Abi::default();
        for item in items {
            match item {
                Value::String(fragment) => abi.push_human(fragment)?,
                Value::Object(_) => abi.push_json(item)?,
                other => return Err(abi_error(format!("invalid ABI entry: {other}"))),
            }
        }
        Ok(abi)
    }

    pub fn parse_human_readable<S: AsRef<str>>(fragments: &[S]) -> Result<Self, FhevmError> {
        let mut abi = Abi::default();
        for fragment in fragments {
            abi.push_human(fragment.as_ref())?;
        }
        Ok(abi)
    }

    fn push_human(&mut self, fragment: &str) -> Result<(), FhevmError> {
        let fragment = fragment.trim();
        if let Some(body) = fragment.strip_prefix("function ") {
            let (name, params, rest) = split_fragment(body)?;
            let mut state_mutability = StateMutability::NonPayable;
            let mut outputs = Vec::new();
            let mut modifiers = rest;
            if let Some(index) = rest.find("returns") {
                modifiers = &rest[..index];
                let returns = rest[index + "returns".len()..].trim();
                let list = returns
                    .strip_prefix('(')
                    .and_then(|inner| inner.strip_suffix(')'))
                    .ok_or_else(|| abi_error(format!("invalid returns clause in {fragment}")))?;
                if list.contains('(') {
                    return Err(abi_error(format!("tuple outputs are not supported: {fragment}")));
                }
                outputs = parse_param_list(list)?;
            }
            for word in modifiers.split_whitespace() {
                if let Some(mutability) = StateMutability::parse(word) {
                    state_mutability = mutability;
                }
            }
            self.functions.push(Function {
                name: name.to_string(),
                inputs: parse_param_list(params)?,
                outputs,
                state_mutability,
            });
        } else if let Some(body) = fragment.strip_prefix("event ") {
            let (name, params, rest) = split_fragment(body)?;
            self.events.push(Event {
                name: name.to_string(),
                inputs: parse_param_list(params)?,
                anonymous: rest.split_whitespace().any(|word| word == "anonymous"),
            });
        } else if !(fragment.starts_with("constructor")
            || fragment.starts_with("error ")
            || fragment.starts_with("fallback")
            || fragment.starts_with("receive"))
        {
            return Err(abi_error(format!("unrecognized ABI fragment: {fragment}")));
        }
        Ok(())
    }

    fn json_params(value: Option<&Value>) -> Result<Vec<Param>, FhevmError> {
        let Some(items) = value.and_then(Value::as_array) else {
            return Ok(Vec::new());
        };
        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let kind = item
                    .get("type")
                    .and_then(Value::as_str)
                    .ok_or_else(|| abi_error(format!("parameter without type: {item}")))?;
                let name = item
                    .get("name")
                    .and_then(Value::as_str)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("arg{index}"));
                Ok(Param {
                    name,
                    kind: ParamType::parse(kind)?,
                    indexed: item.get("indexed").and_then(Value::as_bool).unwrap_or(false),
                })
            })
            .collect()
    }

    fn push_json(&mut self, item: &Value) -> Result<(), FhevmError> {
        let kind = item.get("type").and_then(Value::as_str).unwrap_or("function");
        let name = || {
            item.get("name")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| abi_error(format!("{kind} entry without name: {item}")))
        };
        match kind {
            "function" => {
                let state_mutability = item
                    .get("stateMutability")
                    .and_then(Value::as_str)
                    .and_then(StateMutability::parse)
                    .unwrap_or_else(|| {
                        if item.get("constant").and_then(Value::as_bool) == Some(true) {
                            StateMutability::View
                        } else {
                            StateMutability::NonPayable
                        }
                    });
                self.functions.push(Function {
                    name: name()?,
                    inputs: Self::json_params(item.get("inputs"))?,
                    outputs: Self::json_params(item.get("outputs"))?,
                    state_mutability,
                });
            }
            "event" => self.events.push(Event {
                name: name()?,
                inputs: Self::json_params(item.get("inputs"))?,
                anonymous: item.get("anonymous").and_then(Value::as_bool).unwrap_or(false),
            }),
            "constructor" | "fallback" | "receive" | "error" => {}
            other => return Err(abi_error(format!("unsupported ABI entry type: {other}"))),
        }
        Ok(())
    }

    /// Look up a function by bare name or full signature.
    pub fn function(&self, name: &str) -> Result<&Function, FhevmError> {
        let lookup = |candidate: &&Function| {
            if name.contains('(') {
                candidate.signature() == name
            } else {
                candidate.name == name
            }
        };
        self.functions
            .iter()
            .find(lookup)
            .ok_or_else(|| abi_error(format!("function {name} not found in ABI")))
    }

    pub fn event(&self, name: &str) -> Result<&Event, FhevmError> {
        self.events
            .iter()
            .find(|event| event.name == name || event.signature() == name)
            .ok_or_else(|| abi_error(format!("event {name} not found in ABI")))
    }
}
