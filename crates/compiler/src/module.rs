//! The module binary layout (C9) — a self-contained, little-endian byte
//! image the VM can parse into section addresses, and the bundle
//! container that wraps a sequence of modules.
//!
//! ```text
//!  offset  size  field
//!   0      4     total module size (bytes)
//!   4      4     jumpsCount
//!   8      4     paramCount
//!  12      4     dataCount
//!  16      4     subsCount
//!  20      4     codeAddr
//!  ...           jumpsAddr / paramAddr / dataAddr / subsAddr — present only
//!                for sections whose count is nonzero, packed tightly in
//!                that order right after codeAddr
//!  ...           code bytes (4-byte aligned words)
//!  ...           jumps: jumpsCount x 4-byte offsets into `data`
//!  ...           data: packed 4-byte-aligned string bytes
//!  ...           params / subs: reserved for future function support
//! ```

use std::fmt;

pub const HEADER_COUNTS_LEN: usize = 20; // total, jumpsCount, paramCount, dataCount, subsCount

/// A self-contained executable image produced by the module builder.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub code: Vec<u8>,
    /// Absolute byte offsets into `data`, indexed by the 32-bit jump index
    /// embedded in the code stream.
    pub jumps: Vec<u32>,
    pub data: Vec<u8>,
    /// Reserved for future function support.
    pub params: Vec<u8>,
    /// Reserved for future function support.
    pub subs: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleError {
    TooShort,
    SizeMismatch { declared: u32, actual: u32 },
    SectionOutOfBounds { section: &'static str },
    Misaligned { section: &'static str },
}

impl fmt::Display for ModuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleError::TooShort => write!(f, "module buffer shorter than its header"),
            ModuleError::SizeMismatch { declared, actual } => write!(
                f,
                "module header declares size {declared} but buffer is {actual} bytes"
            ),
            ModuleError::SectionOutOfBounds { section } => {
                write!(f, "module section `{section}` runs past the end of the buffer")
            }
            ModuleError::Misaligned { section } => {
                write!(f, "module section `{section}` is not 4-byte aligned")
            }
        }
    }
}

impl std::error::Error for ModuleError {}

fn pad4(len: usize) -> usize {
    (len + 3) & !3
}

impl Module {
    /// Serialize to the wire layout described above.
    pub fn serialize(&self) -> Vec<u8> {
        let jumps_count = self.jumps.len() as u32;
        let param_count = self.params.len() as u32;
        let data_count = self.data.len() as u32;
        let subs_count = self.subs.len() as u32;

        let code_len = pad4(self.code.len());
        let jumps_len = self.jumps.len() * 4;
        let params_len = pad4(self.params.len());
        let data_len = pad4(self.data.len());
        let subs_len = pad4(self.subs.len());

        let mut addr_fields = 1; // codeAddr always present
        if jumps_count > 0 {
            addr_fields += 1;
        }
        if param_count > 0 {
            addr_fields += 1;
        }
        if data_count > 0 {
            addr_fields += 1;
        }
        if subs_count > 0 {
            addr_fields += 1;
        }

        let header_len = HEADER_COUNTS_LEN + addr_fields * 4;
        let code_addr = header_len as u32;
        let jumps_addr = code_addr + code_len as u32;
        let params_addr = jumps_addr + jumps_len as u32;
        let data_addr = params_addr + params_len as u32;
        let subs_addr = data_addr + data_len as u32;

        let total_size = subs_addr as usize + subs_len;

        let mut out = Vec::with_capacity(total_size);
        out.extend_from_slice(&(total_size as u32).to_le_bytes());
        out.extend_from_slice(&jumps_count.to_le_bytes());
        out.extend_from_slice(&param_count.to_le_bytes());
        out.extend_from_slice(&data_count.to_le_bytes());
        out.extend_from_slice(&subs_count.to_le_bytes());
        out.extend_from_slice(&code_addr.to_le_bytes());
        if jumps_count > 0 {
            out.extend_from_slice(&jumps_addr.to_le_bytes());
        }
        if param_count > 0 {
            out.extend_from_slice(&params_addr.to_le_bytes());
        }
        if data_count > 0 {
            out.extend_from_slice(&data_addr.to_le_bytes());
        }
        if subs_count > 0 {
            out.extend_from_slice(&subs_addr.to_le_bytes());
        }

        out.extend_from_slice(&self.code);
        out.resize(jumps_addr as usize, 0);
        for offset in &self.jumps {
            out.extend_from_slice(&offset.to_le_bytes());
        }
        out.resize(params_addr as usize, 0);
        out.extend_from_slice(&self.params);
        out.resize(data_addr as usize, 0);
        out.extend_from_slice(&self.data);
        out.resize(subs_addr as usize, 0);
        out.extend_from_slice(&self.subs);
        out.resize(total_size, 0);

        out
    }

    /// Parse a module image, validating that every section lies within the
    /// buffer and that the declared size matches its actual length.
    pub fn parse(buf: &[u8]) -> Result<Module, ModuleError> {
        if buf.len() < HEADER_COUNTS_LEN + 4 {
            return Err(ModuleError::TooShort);
        }
        let read_u32 = |at: usize| -> u32 {
            u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
        };

        let total_size = read_u32(0);
        let jumps_count = read_u32(4) as usize;
        let param_count = read_u32(8) as usize;
        let data_count = read_u32(12) as usize;
        let subs_count = read_u32(16) as usize;

        if total_size as usize != buf.len() {
            return Err(ModuleError::SizeMismatch {
                declared: total_size,
                actual: buf.len() as u32,
            });
        }

        let mut cursor = HEADER_COUNTS_LEN;
        let code_addr = read_u32(cursor) as usize;
        cursor += 4;
        let jumps_addr = if jumps_count > 0 {
            let v = read_u32(cursor) as usize;
            cursor += 4;
            Some(v)
        } else {
            None
        };
        let params_addr = if param_count > 0 {
            let v = read_u32(cursor) as usize;
            cursor += 4;
            Some(v)
        } else {
            None
        };
        let data_addr = if data_count > 0 {
            let v = read_u32(cursor) as usize;
            cursor += 4;
            Some(v)
        } else {
            None
        };
        let subs_addr = if subs_count > 0 {
            let v = read_u32(cursor) as usize;
            cursor += 4;
            Some(v)
        } else {
            None
        };
        let _ = cursor;

        if code_addr % 4 != 0 {
            return Err(ModuleError::Misaligned { section: "code" });
        }
        let code_end = jumps_addr.or(params_addr).or(data_addr).or(subs_addr).unwrap_or(buf.len());
        if code_end > buf.len() {
            return Err(ModuleError::SectionOutOfBounds { section: "code" });
        }
        let code = buf[code_addr..code_end].to_vec();

        let jumps = if let Some(jumps_addr) = jumps_addr {
            let end = jumps_addr + jumps_count * 4;
            if end > buf.len() {
                return Err(ModuleError::SectionOutOfBounds { section: "jumps" });
            }
            (0..jumps_count)
                .map(|i| read_u32(jumps_addr + i * 4))
                .collect()
        } else {
            Vec::new()
        };

        let params_end = data_addr.or(subs_addr);
        let params = if let Some(params_addr) = params_addr {
            let end = params_end.unwrap_or(buf.len());
            if end > buf.len() || end < params_addr {
                return Err(ModuleError::SectionOutOfBounds { section: "params" });
            }
            buf[params_addr..params_addr + param_count].to_vec()
        } else {
            Vec::new()
        };

        let data = if let Some(data_addr) = data_addr {
            if data_addr + data_count > buf.len() {
                return Err(ModuleError::SectionOutOfBounds { section: "data" });
            }
            buf[data_addr..data_addr + data_count].to_vec()
        } else {
            Vec::new()
        };

        let subs = if let Some(subs_addr) = subs_addr {
            if subs_addr + subs_count > buf.len() {
                return Err(ModuleError::SectionOutOfBounds { section: "subs" });
            }
            buf[subs_addr..subs_addr + subs_count].to_vec()
        } else {
            Vec::new()
        };

        Ok(Module {
            code,
            jumps,
            data,
            params,
            subs,
        })
    }
}

/// The multi-module bundle container: a version triple, a module count, a
/// zero-terminated 4-aligned build string, then modules concatenated.
#[derive(Debug, Clone)]
pub struct Bundle {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
    pub build: String,
    pub modules: Vec<Module>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleError {
    TooShort,
    TooManyModules,
    MajorMismatch { expected: u8, found: u8 },
    MinorTooNew { runtime: u8, found: u8 },
    Module(ModuleError),
}

impl fmt::Display for BundleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BundleError::TooShort => write!(f, "bundle buffer shorter than its header"),
            BundleError::TooManyModules => write!(f, "bundle module count byte overflowed"),
            BundleError::MajorMismatch { expected, found } => {
                write!(f, "bundle major version {found} does not match runtime major {expected}")
            }
            BundleError::MinorTooNew { runtime, found } => write!(
                f,
                "bundle minor version {found} is newer than runtime minor {runtime}"
            ),
            BundleError::Module(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for BundleError {}

impl Bundle {
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = vec![self.major, self.minor, self.patch, self.modules.len() as u8];
        out.extend_from_slice(self.build.as_bytes());
        out.push(0);
        while out.len() % 4 != 0 {
            out.push(0);
        }
        for module in &self.modules {
            out.extend_from_slice(&module.serialize());
        }
        out
    }

    /// Parse and validate against the running major/minor version.
    /// Major mismatch is a hard failure; a newer minor is a hard failure
    /// too (the runtime can't understand it); patch/build are
    /// warning-only and are returned for the caller to log.
    pub fn parse(buf: &[u8], runtime_major: u8, runtime_minor: u8) -> Result<Bundle, BundleError> {
        if buf.len() < 4 {
            return Err(BundleError::TooShort);
        }
        let major = buf[0];
        let minor = buf[1];
        let patch = buf[2];
        let module_count = buf[3] as usize;

        if major != runtime_major {
            return Err(BundleError::MajorMismatch {
                expected: runtime_major,
                found: major,
            });
        }
        if minor > runtime_minor {
            return Err(BundleError::MinorTooNew {
                runtime: runtime_minor,
                found: minor,
            });
        }

        let mut cursor = 4;
        let build_start = cursor;
        while cursor < buf.len() && buf[cursor] != 0 {
            cursor += 1;
        }
        let build = String::from_utf8_lossy(&buf[build_start..cursor]).into_owned();
        cursor += 1; // skip the terminator
        while cursor % 4 != 0 {
            cursor += 1;
        }

        let mut modules = Vec::with_capacity(module_count);
        let mut remaining = &buf[cursor..];
        for _ in 0..module_count {
            if remaining.len() < 4 {
                return Err(BundleError::TooShort);
            }
            let size = u32::from_le_bytes([remaining[0], remaining[1], remaining[2], remaining[3]]) as usize;
            if size > remaining.len() {
                return Err(BundleError::TooShort);
            }
            let module = Module::parse(&remaining[..size]).map_err(BundleError::Module)?;
            modules.push(module);
            remaining = &remaining[size..];
        }
        if modules.len() != module_count {
            return Err(BundleError::TooManyModules);
        }

        Ok(Bundle {
            major,
            minor,
            patch,
            build,
            modules,
        })
    }
}
