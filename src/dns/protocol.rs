//! DNS message types and the wire codec. Messages are read from and
//! written to `PacketBuffer`s only; sockets are the client module's
//! concern.

use std::fmt;
use std::net::Ipv4Addr;

use log::warn;

use crate::dns::buffer::{PacketBuffer, VectorPacketBuffer};
use crate::dns::{ProtocolError, Result};

pub const CLASS_IN: u16 = 1;

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum QueryType {
    UNKNOWN = 0,
    A = 1,
    NS = 2,
    CNAME = 5,
    MX = 15,
}

impl QueryType {
    pub fn from_num(num: u16) -> QueryType {
        match num {
            1 => QueryType::A,
            2 => QueryType::NS,
            5 => QueryType::CNAME,
            15 => QueryType::MX,
            _ => QueryType::UNKNOWN,
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match *self {
            QueryType::A => "A",
            QueryType::NS => "NS",
            QueryType::CNAME => "CNAME",
            QueryType::MX => "MX",
            QueryType::UNKNOWN => "UNKNOWN",
        };

        write!(f, "{}", name)
    }
}

/// The interpreted rdata of a resource record, dispatched purely on the
/// wire type field. Types we don't interpret keep their raw bytes so the
/// rest of the message stays aligned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    UNKNOWN { qtype: u16, data: Vec<u8> },
    A(Ipv4Addr),
    NS(String),
    CNAME(String),
    MX { preference: u16, exchange: String },
}

impl RecordData {
    pub fn type_num(&self) -> u16 {
        match *self {
            RecordData::UNKNOWN { qtype, .. } => qtype,
            RecordData::A(..) => QueryType::A as u16,
            RecordData::NS(..) => QueryType::NS as u16,
            RecordData::CNAME(..) => QueryType::CNAME as u16,
            RecordData::MX { .. } => QueryType::MX as u16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub name: String,
    pub class: u16,
    pub ttl: u32,
    pub data: RecordData,
}

impl ResourceRecord {
    pub fn read<T: PacketBuffer>(buffer: &mut T) -> Result<ResourceRecord> {
        let mut domain = String::new();
        buffer.read_qname(&mut domain)?;

        let qtype_num = buffer.read_u16()?;
        let qtype = QueryType::from_num(qtype_num);
        let class = buffer.read_u16()?;
        if class != CLASS_IN {
            warn!("record for {} has class {}, expected IN", domain, class);
        }
        let ttl = buffer.read_u32()?;
        let data_len = buffer.read_u16()?;
        let data_start = buffer.pos();

        let data = match qtype {
            QueryType::A => {
                if data_len != 4 {
                    return Err(ProtocolError::MalformedRecord(
                        "A record rdata must be 4 bytes",
                    ));
                }

                let raw_addr = buffer.read_u32()?;
                let addr = Ipv4Addr::new(
                    ((raw_addr >> 24) & 0xFF) as u8,
                    ((raw_addr >> 16) & 0xFF) as u8,
                    ((raw_addr >> 8) & 0xFF) as u8,
                    (raw_addr & 0xFF) as u8,
                );

                RecordData::A(addr)
            }
            QueryType::NS => {
                let mut ns = String::new();
                buffer.read_qname(&mut ns)?;

                RecordData::NS(ns)
            }
            QueryType::CNAME => {
                let mut cname = String::new();
                buffer.read_qname(&mut cname)?;

                RecordData::CNAME(cname)
            }
            QueryType::MX => {
                let preference = buffer.read_u16()?;
                let mut mx = String::new();
                buffer.read_qname(&mut mx)?;

                RecordData::MX {
                    preference,
                    exchange: mx,
                }
            }
            QueryType::UNKNOWN => {
                let data = buffer.get_range(data_start, data_len as usize)?.to_vec();
                buffer.step(data_len as usize)?;

                RecordData::UNKNOWN {
                    qtype: qtype_num,
                    data,
                }
            }
        };

        // The interpreted rdata must line up with the declared length,
        // otherwise every later record would be read from garbage offsets
        if buffer.pos() != data_start + data_len as usize {
            return Err(ProtocolError::MalformedRecord(
                "rdata does not match its declared length",
            ));
        }

        Ok(ResourceRecord {
            name: domain,
            class,
            ttl,
            data,
        })
    }

    pub fn write<T: PacketBuffer>(&self, buffer: &mut T) -> Result<()> {
        buffer.write_qname(&self.name)?;
        buffer.write_u16(self.data.type_num())?;
        buffer.write_u16(self.class)?;
        buffer.write_u32(self.ttl)?;

        match self.data {
            RecordData::A(ref addr) => {
                buffer.write_u16(4)?;

                for octet in addr.octets().iter() {
                    buffer.write_u8(*octet)?;
                }
            }
            RecordData::NS(ref host) | RecordData::CNAME(ref host) => {
                buffer.write_u16(buffer.qname_len(host) as u16)?;
                buffer.write_qname(host)?;
            }
            RecordData::MX {
                preference,
                ref exchange,
            } => {
                buffer.write_u16(2 + buffer.qname_len(exchange) as u16)?;
                buffer.write_u16(preference)?;
                buffer.write_qname(exchange)?;
            }
            RecordData::UNKNOWN { ref data, .. } => {
                buffer.write_u16(data.len() as u16)?;

                for b in data {
                    buffer.write_u8(*b)?;
                }
            }
        }

        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct DnsHeader {
    pub id: u16, // 16 bits

    pub recursion_desired: bool,    // 1 bit
    pub truncated_message: bool,    // 1 bit
    pub authoritative_answer: bool, // 1 bit
    pub opcode: u8,                 // 4 bits
    pub response: bool,             // 1 bit

    pub rescode: u8,             // 4 bits
    pub checking_disabled: bool, // 1 bit
    pub authed_data: bool,       // 1 bit
    pub z: bool,                 // 1 bit
    pub recursion_available: bool, // 1 bit

    pub questions: u16,             // 16 bits
    pub answers: u16,               // 16 bits
    pub authoritative_entries: u16, // 16 bits
    pub resource_entries: u16,      // 16 bits
}

impl DnsHeader {
    pub fn new() -> DnsHeader {
        DnsHeader {
            id: 0,

            recursion_desired: false,
            truncated_message: false,
            authoritative_answer: false,
            opcode: 0,
            response: false,

            rescode: 0,
            checking_disabled: false,
            authed_data: false,
            z: false,
            recursion_available: false,

            questions: 0,
            answers: 0,
            authoritative_entries: 0,
            resource_entries: 0,
        }
    }

    pub fn write<T: PacketBuffer>(&self, buffer: &mut T) -> Result<()> {
        buffer.write_u16(self.id)?;

        buffer.write_u8(
            (self.recursion_desired as u8)
                | ((self.truncated_message as u8) << 1)
                | ((self.authoritative_answer as u8) << 2)
                | (self.opcode << 3)
                | ((self.response as u8) << 7),
        )?;

        buffer.write_u8(
            self.rescode
                | ((self.checking_disabled as u8) << 4)
                | ((self.authed_data as u8) << 5)
                | ((self.z as u8) << 6)
                | ((self.recursion_available as u8) << 7),
        )?;

        buffer.write_u16(self.questions)?;
        buffer.write_u16(self.answers)?;
        buffer.write_u16(self.authoritative_entries)?;
        buffer.write_u16(self.resource_entries)?;

        Ok(())
    }

    pub fn read<T: PacketBuffer>(&mut self, buffer: &mut T) -> Result<()> {
        self.id = buffer.read_u16()?;

        let flags = buffer.read_u16()?;
        let a = (flags >> 8) as u8;
        let b = (flags & 0xFF) as u8;
        self.recursion_desired = (a & 1) > 0;
        self.truncated_message = (a & (1 << 1)) > 0;
        self.authoritative_answer = (a & (1 << 2)) > 0;
        self.opcode = (a >> 3) & 0x0F;
        self.response = (a & (1 << 7)) > 0;

        self.rescode = b & 0x0F;
        self.checking_disabled = (b & (1 << 4)) > 0;
        self.authed_data = (b & (1 << 5)) > 0;
        self.z = (b & (1 << 6)) > 0;
        self.recursion_available = (b & (1 << 7)) > 0;

        self.questions = buffer.read_u16()?;
        self.answers = buffer.read_u16()?;
        self.authoritative_entries = buffer.read_u16()?;
        self.resource_entries = buffer.read_u16()?;

        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DnsQuestion {
    pub name: String,
    pub qtype: QueryType,
}

impl DnsQuestion {
    pub fn new(name: &str, qtype: QueryType) -> DnsQuestion {
        DnsQuestion {
            name: name.to_string(),
            qtype,
        }
    }

    pub fn write<T: PacketBuffer>(&self, buffer: &mut T) -> Result<()> {
        buffer.write_qname(&self.name)?;
        buffer.write_u16(self.qtype as u16)?;
        buffer.write_u16(CLASS_IN)?;

        Ok(())
    }

    pub fn read<T: PacketBuffer>(&mut self, buffer: &mut T) -> Result<()> {
        buffer.read_qname(&mut self.name)?;
        self.qtype = QueryType::from_num(buffer.read_u16()?);
        let class = buffer.read_u16()?;
        if class != CLASS_IN {
            warn!("question for {} has class {}, expected IN", self.name, class);
        }

        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct DnsPacket {
    pub header: DnsHeader,
    pub questions: Vec<DnsQuestion>,
    pub answers: Vec<ResourceRecord>,
    pub authorities: Vec<ResourceRecord>,
    pub resources: Vec<ResourceRecord>,
}

impl DnsPacket {
    pub fn new() -> DnsPacket {
        DnsPacket {
            header: DnsHeader::new(),
            questions: Vec::new(),
            answers: Vec::new(),
            authorities: Vec::new(),
            resources: Vec::new(),
        }
    }

    pub fn from_buffer<T: PacketBuffer>(buffer: &mut T) -> Result<DnsPacket> {
        let mut result = DnsPacket::new();
        result.header.read(buffer)?;

        if result.header.opcode != 0 {
            warn!("message has unsupported opcode {}", result.header.opcode);
        }

        for _ in 0..result.header.questions {
            let mut question = DnsQuestion::new("", QueryType::UNKNOWN);
            question.read(buffer)?;
            result.questions.push(question);
        }

        for _ in 0..result.header.answers {
            let rec = ResourceRecord::read(buffer)?;
            result.answers.push(rec);
        }
        for _ in 0..result.header.authoritative_entries {
            let rec = ResourceRecord::read(buffer)?;
            result.authorities.push(rec);
        }
        for _ in 0..result.header.resource_entries {
            let rec = ResourceRecord::read(buffer)?;
            result.resources.push(rec);
        }

        Ok(result)
    }

    pub fn write<T: PacketBuffer>(&mut self, buffer: &mut T) -> Result<()> {
        self.header.questions = self.questions.len() as u16;
        self.header.answers = self.answers.len() as u16;
        self.header.authoritative_entries = self.authorities.len() as u16;
        self.header.resource_entries = self.resources.len() as u16;

        self.header.write(buffer)?;

        for question in &self.questions {
            question.write(buffer)?;
        }
        for rec in self
            .answers
            .iter()
            .chain(self.authorities.iter())
            .chain(self.resources.iter())
        {
            rec.write(buffer)?;
        }

        Ok(())
    }
}

/// Serializes the outgoing query datagram: a standard query header with
/// recursion desired and a single question. Deterministic for a given id.
pub fn build_query(id: u16, qname: &str, qtype: QueryType) -> Result<Vec<u8>> {
    let mut packet = DnsPacket::new();
    packet.header.id = id;
    packet.header.recursion_desired = true;
    packet.questions.push(DnsQuestion::new(qname, qtype));

    let mut buffer = VectorPacketBuffer::new();
    packet.write(&mut buffer)?;

    Ok(buffer.buffer)
}
