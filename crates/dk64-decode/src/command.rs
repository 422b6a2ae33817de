//! F3DEX2 command decoding.
//!
//! Every command is 64 bits wide. The first byte selects the opcode; the
//! remaining seven bytes are operands. Only a handful of opcodes matter for
//! mesh reconstruction (`G_VTX`, `G_TRI1`, `G_TRI2`, `G_DL`, `G_ENDDL`). The
//! rest are recognised so that a stream can be walked, and then ignored.

use crate::Triangle;
use crate::bytes::{read_u16, read_u24};
use crate::error::{DecodeError, DecodeResult};

/// Width of one encoded command in bytes.
pub const COMMAND_SIZE: usize = 8;

macro_rules! opcodes {
    ($($variant:ident = $value:literal => $name:literal,)*) => {
        /// F3DEX2 opcode byte.
        ///
        /// Bytes `0x08..=0xD2` are not part of the opcode space and never
        /// appear in valid display lists.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum Opcode {
            $($variant = $value,)*
        }

        impl Opcode {
            /// Map a raw byte to its opcode.
            #[must_use]
            pub fn from_byte(byte: u8) -> Option<Self> {
                match byte {
                    $($value => Some(Self::$variant),)*
                    _ => None,
                }
            }

            /// The microcode mnemonic, e.g. `G_VTX`.
            #[must_use]
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }
        }
    };
}

opcodes! {
    SpNoop = 0x00 => "G_SPNOOP",
    Vtx = 0x01 => "G_VTX",
    ModifyVtx = 0x02 => "G_MODIFYVTX",
    CullDl = 0x03 => "G_CULLDL",
    BranchZ = 0x04 => "G_BRANCH_Z",
    Tri1 = 0x05 => "G_TRI1",
    Tri2 = 0x06 => "G_TRI2",
    Quad = 0x07 => "G_QUAD",
    Special3 = 0xD3 => "G_SPECIAL_3",
    Special2 = 0xD4 => "G_SPECIAL_2",
    Special1 = 0xD5 => "G_SPECIAL_1",
    DmaIo = 0xD6 => "G_DMA_IO",
    Texture = 0xD7 => "G_TEXTURE",
    PopMtx = 0xD8 => "G_POPMTX",
    GeometryMode = 0xD9 => "G_GEOMETRYMODE",
    Mtx = 0xDA => "G_MTX",
    MoveWord = 0xDB => "G_MOVEWORD",
    MoveMem = 0xDC => "G_MOVEMEM",
    LoadUcode = 0xDD => "G_LOAD_UCODE",
    Dl = 0xDE => "G_DL",
    EndDl = 0xDF => "G_ENDDL",
    Noop = 0xE0 => "G_NOOP",
    RdpHalf1 = 0xE1 => "G_RDPHALF_1",
    SetOtherModeL = 0xE2 => "G_SETOTHERMODE_L",
    SetOtherModeH = 0xE3 => "G_SETOTHERMODE_H",
    TexRect = 0xE4 => "G_TEXRECT",
    TexRectFlip = 0xE5 => "G_TEXRECTFLIP",
    RdpLoadSync = 0xE6 => "G_RDPLOADSYNC",
    RdpPipeSync = 0xE7 => "G_RDPPIPESYNC",
    RdpTileSync = 0xE8 => "G_RDPTILESYNC",
    RdpFullSync = 0xE9 => "G_RDPFULLSYNC",
    SetKeyGb = 0xEA => "G_SETKEYGB",
    SetKeyR = 0xEB => "G_SETKEYR",
    SetConvert = 0xEC => "G_SETCONVERT",
    SetScissor = 0xED => "G_SETSCISSOR",
    SetPrimDepth = 0xEE => "G_SETPRIMDEPTH",
    RdpSetOtherMode = 0xEF => "G_RDPSETOTHERMODE",
    LoadTlut = 0xF0 => "G_LOADTLUT",
    RdpHalf2 = 0xF1 => "G_RDPHALF_2",
    SetTileSize = 0xF2 => "G_SETTILESIZE",
    LoadBlock = 0xF3 => "G_LOADBLOCK",
    LoadTile = 0xF4 => "G_LOADTILE",
    SetTile = 0xF5 => "G_SETTILE",
    FillRect = 0xF6 => "G_FILLRECT",
    SetFillColor = 0xF7 => "G_SETFILLCOLOR",
    SetFogColor = 0xF8 => "G_SETFOGCOLOR",
    SetBlendColor = 0xF9 => "G_SETBLENDCOLOR",
    SetPrimColor = 0xFA => "G_SETPRIMCOLOR",
    SetEnvColor = 0xFB => "G_SETENVCOLOR",
    SetCombine = 0xFC => "G_SETCOMBINE",
    SetTimg = 0xFD => "G_SETTIMG",
    SetZimg = 0xFE => "G_SETZIMG",
    SetCimg = 0xFF => "G_SETCIMG",
}

/// A decoded command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Load `vertex_count` vertices from `address` in the active vertex window.
    Vertex {
        vertex_count: u8,
        /// Byte 3 less twice the count. Informational only.
        buffer_start: i16,
        address: u32,
    },
    Triangle1(Triangle),
    Triangle2(Triangle, Triangle),
    /// Branch into the display list at `target` (relative to the region start).
    DisplayList {
        store_return_address: bool,
        target: u32,
    },
    EndDisplayList,
    /// Any opcode without vertex, triangle or branch semantics.
    Inert(Opcode),
}

impl Command {
    /// Decode one command. `offset` is only used for error reporting.
    pub fn decode(raw: &[u8; COMMAND_SIZE], offset: usize) -> DecodeResult<Self> {
        let opcode = Opcode::from_byte(raw[0]).ok_or(DecodeError::MalformedOpcode {
            offset,
            opcode: raw[0],
        })?;

        let command = match opcode {
            Opcode::Vtx => {
                // Count sits in bits 4..12 of the packed 16-bit field.
                #[allow(clippy::cast_possible_truncation)]
                let vertex_count = ((read_u16(raw, 1) >> 4) & 0xFF) as u8;
                Self::Vertex {
                    vertex_count,
                    buffer_start: i16::from(raw[3]) - 2 * i16::from(vertex_count),
                    address: read_u24(raw, 5),
                }
            }
            Opcode::Tri1 => Self::Triangle1(Triangle::from_slots(raw[1], raw[2], raw[3])),
            Opcode::Tri2 => Self::Triangle2(
                Triangle::from_slots(raw[1], raw[2], raw[3]),
                Triangle::from_slots(raw[5], raw[6], raw[7]),
            ),
            Opcode::Dl => Self::DisplayList {
                store_return_address: raw[1] == 0,
                target: read_u24(raw, 5),
            },
            Opcode::EndDl => Self::EndDisplayList,
            other => Self::Inert(other),
        };
        Ok(command)
    }

    /// The opcode this command was decoded from.
    #[must_use]
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Vertex { .. } => Opcode::Vtx,
            Self::Triangle1(_) => Opcode::Tri1,
            Self::Triangle2(..) => Opcode::Tri2,
            Self::DisplayList { .. } => Opcode::Dl,
            Self::EndDisplayList => Opcode::EndDl,
            Self::Inert(opcode) => *opcode,
        }
    }
}

/// Iterate over the commands of a byte region, yielding `(offset, command)`.
///
/// Stops after the first error. A trailing partial command is reported as
/// [`DecodeError::TruncatedStream`].
pub fn commands(data: &[u8]) -> impl Iterator<Item = DecodeResult<(usize, Command)>> + '_ {
    let mut offset = 0;
    let mut failed = false;
    std::iter::from_fn(move || {
        if failed || offset >= data.len() {
            return None;
        }
        let item = read_command(data, offset).map(|command| (offset, command));
        failed = item.is_err();
        offset += COMMAND_SIZE;
        Some(item)
    })
}

/// Decode the command starting at `offset`.
pub(crate) fn read_command(data: &[u8], offset: usize) -> DecodeResult<Command> {
    let raw: &[u8; COMMAND_SIZE] = data
        .get(offset..offset + COMMAND_SIZE)
        .and_then(|slice| slice.try_into().ok())
        .ok_or(DecodeError::TruncatedStream {
            offset,
            remaining: data.len().saturating_sub(offset),
        })?;
    Command::decode(raw, offset)
}
