//! Protocol frames: the request/reply envelope.
//!
//! A request carries a sequence number and one operation; a reply echoes
//! the sequence number and carries either one tagged wire value or a
//! fault. Replies to operations without a result carry the unit value.
//!
//! ## Invariants
//!
//! - Reply sequence numbers must match request sequence numbers; the
//!   caller enforces correlation.
//! - Unknown map fields are skipped for forward compatibility; unknown
//!   operation names are errors.

use riftpack::Decoder;
use riftpack::Encoder;

use crate::error::Error;
use crate::error::Fault;
use crate::error::Result;
use crate::value::ModuleId;
use crate::value::ResourceId;
use crate::value::WireValue;

/// One operation of the bridge surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Register a module from manifest text; answers with the module id.
    AddModule { source: String },
    /// Drop a module namespace. Idempotent; answers with unit.
    RemoveModule { module: ModuleId },
    /// Invoke a named symbol of a module with tagged arguments; answers
    /// with exactly one tagged result.
    Call {
        module: ModuleId,
        symbol: String,
        args: Vec<WireValue>,
    },
    /// Drop one identity from the host's active resource set.
    Release { resource: ResourceId },
    /// Start the background collection loop.
    EnableGc,
    /// Stop the background collection loop.
    DisableGc,
    /// Run one synchronous sweep to fixed point.
    CollectGarbage,
    /// Terminate the serving loop after replying.
    ShutDown,
}

impl Request {
    fn op_name(&self) -> &'static str {
        match self {
            Request::AddModule { .. } => "add-module",
            Request::RemoveModule { .. } => "remove-module",
            Request::Call { .. } => "call",
            Request::Release { .. } => "release",
            Request::EnableGc => "enable-gc",
            Request::DisableGc => "disable-gc",
            Request::CollectGarbage => "collect-garbage",
            Request::ShutDown => "shut-down",
        }
    }

    fn encode_payload(&self, enc: &mut Encoder) -> Result<()> {
        match self {
            Request::AddModule { source } => enc.str(source)?,
            Request::RemoveModule { module } => enc.u64(module.0 as u64)?,
            Request::Call {
                module,
                symbol,
                args,
            } => {
                enc.map_begin()?;
                enc.variant_begin("module")?;
                enc.u64(module.0 as u64)?;
                enc.variant_end()?;
                enc.variant_begin("symbol")?;
                enc.str(symbol)?;
                enc.variant_end()?;
                enc.variant_begin("args")?;
                enc.list_begin()?;
                for arg in args {
                    arg.encode(enc)?;
                }
                enc.list_end()?;
                enc.variant_end()?;
                enc.map_end()?;
            }
            Request::Release { resource } => resource.encode(enc)?,
            Request::EnableGc
            | Request::DisableGc
            | Request::CollectGarbage
            | Request::ShutDown => enc.unit()?,
        }
        Ok(())
    }

    fn decode_payload(op: &str, dec: &mut Decoder<'_>) -> Result<Self> {
        match op {
            "add-module" => Ok(Request::AddModule {
                source: dec.str()?.to_string(),
            }),
            "remove-module" => Ok(Request::RemoveModule {
                module: decode_module_id(dec)?,
            }),
            "call" => {
                let mut module = None;
                let mut symbol = None;
                let mut args = None;
                let mut map = dec.map()?;
                while let Some((key, mut val)) = map.next()? {
                    match key {
                        "module" => module = Some(decode_module_id(&mut val)?),
                        "symbol" => symbol = Some(val.str()?.to_string()),
                        "args" => {
                            let mut items = Vec::new();
                            let mut list = val.list()?;
                            while let Some(mut item) = list.next()? {
                                items.push(WireValue::decode(&mut item)?);
                            }
                            args = Some(items);
                        }
                        _ => val.skip()?,
                    }
                }
                Ok(Request::Call {
                    module: module.ok_or(Error::Malformed("call missing module".into()))?,
                    symbol: symbol.ok_or(Error::Malformed("call missing symbol".into()))?,
                    args: args.ok_or(Error::Malformed("call missing args".into()))?,
                })
            }
            "release" => Ok(Request::Release {
                resource: ResourceId::decode(dec)?,
            }),
            "enable-gc" => {
                dec.unit()?;
                Ok(Request::EnableGc)
            }
            "disable-gc" => {
                dec.unit()?;
                Ok(Request::DisableGc)
            }
            "collect-garbage" => {
                dec.unit()?;
                Ok(Request::CollectGarbage)
            }
            "shut-down" => {
                dec.unit()?;
                Ok(Request::ShutDown)
            }
            _ => Err(Error::UnknownVariant(format!("operation: {}", op))),
        }
    }
}

fn decode_module_id(dec: &mut Decoder<'_>) -> Result<ModuleId> {
    let raw = dec.u64()?;
    u32::try_from(raw)
        .map(ModuleId)
        .map_err(|_| Error::Malformed(format!("module id {} out of range", raw)))
}

/// An outbound or decoded request envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestFrame {
    pub seq: u64,
    pub request: Request,
}

impl RequestFrame {
    pub fn new(seq: u64, request: Request) -> Self {
        Self { seq, request }
    }

    pub fn encode(&self, enc: &mut Encoder) -> Result<()> {
        enc.variant_begin("request")?;
        enc.map_begin()?;
        enc.variant_begin("seq")?;
        enc.u64(self.seq)?;
        enc.variant_end()?;
        enc.variant_begin("op")?;
        enc.variant_begin(self.request.op_name())?;
        self.request.encode_payload(enc)?;
        enc.variant_end()?;
        enc.variant_end()?;
        enc.map_end()?;
        enc.variant_end()?;
        Ok(())
    }

    /// Convenience: encode into a fresh byte vector.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut enc = Encoder::new();
        self.encode(&mut enc)?;
        Ok(enc.into_bytes()?)
    }

    fn decode_body(dec: &mut Decoder<'_>) -> Result<Self> {
        let mut seq = None;
        let mut request = None;
        let mut map = dec.map()?;
        while let Some((key, mut val)) = map.next()? {
            match key {
                "seq" => seq = Some(val.u64()?),
                "op" => {
                    let (op, mut payload) = val.variant()?;
                    request = Some(Request::decode_payload(op, &mut payload)?);
                }
                _ => val.skip()?,
            }
        }
        Ok(Self {
            seq: seq.ok_or(Error::Malformed("request missing seq".into()))?,
            request: request.ok_or(Error::Malformed("request missing op".into()))?,
        })
    }
}

/// An outbound or decoded reply envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyFrame {
    pub seq: u64,
    /// `Ok` carries the single tagged result; `Err` an operation fault.
    pub status: std::result::Result<WireValue, Fault>,
}

impl ReplyFrame {
    pub fn ok(seq: u64, value: WireValue) -> Self {
        Self {
            seq,
            status: Ok(value),
        }
    }

    pub fn fault(seq: u64, fault: Fault) -> Self {
        Self {
            seq,
            status: Err(fault),
        }
    }

    pub fn encode(&self, enc: &mut Encoder) -> Result<()> {
        enc.variant_begin("reply")?;
        enc.map_begin()?;
        enc.variant_begin("seq")?;
        enc.u64(self.seq)?;
        enc.variant_end()?;
        enc.variant_begin("status")?;
        match &self.status {
            Ok(value) => {
                enc.variant_begin("ok")?;
                value.encode(enc)?;
                enc.variant_end()?;
            }
            Err(fault) => {
                enc.variant_begin("err")?;
                enc.variant_begin(fault.tag())?;
                enc.str(fault.message())?;
                enc.variant_end()?;
                enc.variant_end()?;
            }
        }
        enc.variant_end()?;
        enc.map_end()?;
        enc.variant_end()?;
        Ok(())
    }

    /// Convenience: encode into a fresh byte vector.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut enc = Encoder::new();
        self.encode(&mut enc)?;
        Ok(enc.into_bytes()?)
    }

    fn decode_body(dec: &mut Decoder<'_>) -> Result<Self> {
        let mut seq = None;
        let mut status = None;
        let mut map = dec.map()?;
        while let Some((key, mut val)) = map.next()? {
            match key {
                "seq" => seq = Some(val.u64()?),
                "status" => {
                    let (kind, mut payload) = val.variant()?;
                    status = Some(match kind {
                        "ok" => Ok(WireValue::decode(&mut payload)?),
                        "err" => {
                            let (tag, mut body) = payload.variant()?;
                            Err(Fault::from_parts(tag, body.str()?.to_string())?)
                        }
                        _ => {
                            return Err(Error::UnknownVariant(format!("reply status: {}", kind)))
                        }
                    });
                }
                _ => val.skip()?,
            }
        }
        Ok(Self {
            seq: seq.ok_or(Error::Malformed("reply missing seq".into()))?,
            status: status.ok_or(Error::Malformed("reply missing status".into()))?,
        })
    }
}

/// Top-level frame decoder.
#[derive(Debug)]
pub enum Frame {
    Request(RequestFrame),
    Reply(ReplyFrame),
}

impl Frame {
    /// Decodes one frame from raw bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut dec = Decoder::new(bytes);
        let (kind, mut body) = dec.variant()?;
        match kind {
            "request" => Ok(Frame::Request(RequestFrame::decode_body(&mut body)?)),
            "reply" => Ok(Frame::Reply(ReplyFrame::decode_body(&mut body)?)),
            _ => Err(Error::UnknownVariant(format!("top-level frame: {}", kind))),
        }
    }
}
