//! Method descriptor parsing and method access flags.
//!
//! A JVM method descriptor (`(IJLjava/lang/String;)V` style) determines the number of
//! declared parameters, how many local-variable slots they occupy (`long` and `double`
//! take two), and whether the method pushes a return value. All three facts are
//! load-bearing for the frame simulator and for parameter classification, so the
//! descriptor is parsed once at [`crate::bytecode::MethodBody`] construction and kept in
//! parsed form.

use std::fmt;

use bitflags::bitflags;

use crate::Result;

bitflags! {
    /// JVM method access and property flags (`access_flags` of a `method_info` structure).
    ///
    /// Only a few flags influence analysis - [`AccessFlags::ACC_STATIC`] decides whether
    /// local slot 0 holds the receiver - but the full set is carried so callers can
    /// round-trip the value they decoded.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u16 {
        /// Accessible from anywhere.
        const ACC_PUBLIC = 0x0001;
        /// Accessible only within the declaring class.
        const ACC_PRIVATE = 0x0002;
        /// Accessible within the package and subclasses.
        const ACC_PROTECTED = 0x0004;
        /// No receiver; local slot 0 is the first parameter.
        const ACC_STATIC = 0x0008;
        /// Must not be overridden.
        const ACC_FINAL = 0x0010;
        /// Invocation wrapped in a monitor.
        const ACC_SYNCHRONIZED = 0x0020;
        /// Compiler-generated bridge method.
        const ACC_BRIDGE = 0x0040;
        /// Declared with a variable number of arguments.
        const ACC_VARARGS = 0x0080;
        /// Implemented in native code; carries no bytecode.
        const ACC_NATIVE = 0x0100;
        /// Declared without a body.
        const ACC_ABSTRACT = 0x0400;
        /// Strict IEEE 754 floating-point mode.
        const ACC_STRICT = 0x0800;
        /// Not present in source code.
        const ACC_SYNTHETIC = 0x1000;
    }
}

impl AccessFlags {
    /// `true` when the method has no receiver (local slot 0 is the first parameter).
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.contains(AccessFlags::ACC_STATIC)
    }
}

/// One declared parameter of a method descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamType {
    /// The field descriptor of this parameter, e.g. `I` or `Ljava/lang/String;`.
    pub descriptor: String,
    /// `true` for `long` and `double`, which occupy two local slots.
    pub wide: bool,
}

/// A parsed method descriptor.
///
/// # Examples
///
/// ```rust
/// use classflow::bytecode::MethodDescriptor;
///
/// let desc = MethodDescriptor::parse("(IJ)I").unwrap();
/// assert_eq!(desc.param_count(), 2);
/// assert!(desc.returns_value());
/// // `long` at order 1 occupies slots 1 and 2 of a static method
/// assert_eq!(desc.param_slots(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    raw: String,
    params: Vec<ParamType>,
    return_descriptor: String,
}

impl MethodDescriptor {
    /// Parses a raw descriptor string.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Malformed`] when the string is not a well-formed method
    /// descriptor.
    pub fn parse(raw: &str) -> Result<Self> {
        let bytes = raw.as_bytes();
        if bytes.first() != Some(&b'(') {
            return Err(malformed_error!("method descriptor must start with '(': {}", raw));
        }

        let mut params = Vec::new();
        let mut pos = 1;
        while pos < bytes.len() && bytes[pos] != b')' {
            let start = pos;
            pos = skip_field_type(bytes, pos)
                .ok_or_else(|| malformed_error!("invalid parameter type in descriptor: {}", raw))?;
            let descriptor = raw[start..pos].to_string();
            let wide = matches!(bytes[start], b'J' | b'D');
            params.push(ParamType { descriptor, wide });
        }

        if pos >= bytes.len() || bytes[pos] != b')' {
            return Err(malformed_error!("unterminated parameter list in descriptor: {}", raw));
        }
        pos += 1;

        let ret_start = pos;
        let ret_end = if bytes.get(pos) == Some(&b'V') {
            pos + 1
        } else {
            skip_field_type(bytes, pos)
                .ok_or_else(|| malformed_error!("invalid return type in descriptor: {}", raw))?
        };
        if ret_end != bytes.len() {
            return Err(malformed_error!("trailing characters in descriptor: {}", raw));
        }

        Ok(MethodDescriptor {
            raw: raw.to_string(),
            params,
            return_descriptor: raw[ret_start..ret_end].to_string(),
        })
    }

    /// The original descriptor string.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The declared parameters, in order. The receiver is never included.
    #[must_use]
    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    /// Number of declared parameters (receiver excluded).
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Number of local slots the declared parameters occupy (receiver excluded).
    #[must_use]
    pub fn param_slots(&self) -> usize {
        self.params.iter().map(|p| if p.wide { 2 } else { 1 }).sum()
    }

    /// The return type descriptor, `V` for void.
    #[must_use]
    pub fn return_descriptor(&self) -> &str {
        &self.return_descriptor
    }

    /// `true` when invoking this method pushes a value.
    #[must_use]
    pub fn returns_value(&self) -> bool {
        self.return_descriptor != "V"
    }

    /// Maps a local slot to the 0-based order of the parameter that occupies it.
    ///
    /// Walks the declared parameters with a slot cursor that starts at 0 for static
    /// methods and 1 otherwise (slot 0 holds the receiver), advancing by two for `long`
    /// and `double`. Returns `None` when the slot is not the first slot of any declared
    /// parameter - i.e. the receiver slot, the high half of a wide parameter, or a
    /// non-parameter local.
    #[must_use]
    pub fn param_for_slot(&self, slot: u16, is_static: bool) -> Option<usize> {
        let mut cursor: u16 = u16::from(!is_static);
        for (order, param) in self.params.iter().enumerate() {
            if cursor == slot {
                return Some(order);
            }
            cursor += if param.wide { 2 } else { 1 };
        }
        None
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Advances past one field type starting at `pos`, returning the index after it.
fn skip_field_type(bytes: &[u8], mut pos: usize) -> Option<usize> {
    while bytes.get(pos) == Some(&b'[') {
        pos += 1;
    }
    match bytes.get(pos)? {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' => Some(pos + 1),
        b'L' => {
            let end = bytes[pos..].iter().position(|&b| b == b';')?;
            Some(pos + end + 1)
        }
        _ => None,
    }
}
