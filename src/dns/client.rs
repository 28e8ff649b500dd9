//! The query engine: owns the request-response exchange over an
//! unreliable transport, including the timeout and retry handling.
//! Bytes go in and out through the codec only.

use std::io;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::dns::buffer::BytePacketBuffer;
use crate::dns::protocol::{build_query, DnsPacket, QueryType};
use crate::dns::LookupError;

/// Everything that describes a single query. Built once from validated
/// input and not mutated afterwards.
pub struct Query {
    pub id: u16,
    pub name: String,
    pub qtype: QueryType,
    pub server: Ipv4Addr,
    pub port: u16,
    pub timeout: Duration,
    pub max_retries: u32,
}

/// Seam between the engine and the network. The real implementation owns
/// a UDP socket; tests inject a scripted one instead.
pub trait Transport {
    fn send(&mut self, payload: &[u8]) -> io::Result<()>;

    /// Wait for one datagram for at most `timeout`. `Ok(None)` means the
    /// window expired without traffic.
    fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<Option<usize>>;
}

#[derive(Debug)]
pub enum QueryOutcome {
    Answered {
        packet: DnsPacket,
        elapsed: Duration,
        retries_used: u32,
    },
    NotFound {
        elapsed: Duration,
        retries_used: u32,
    },
    ServerError {
        code: u8,
        elapsed: Duration,
        retries_used: u32,
    },
    NoResponse {
        retries_used: u32,
    },
}

enum State {
    Idle,
    Sent { sent_at: Instant, deadline: Instant },
    TimedOut,
}

/// Drives one query to a terminal outcome. The same encoded bytes (and
/// so the same transaction id) are retransmitted on every retry, which
/// lets a late reply to an earlier attempt still be accepted.
pub fn lookup<T: Transport>(query: &Query, transport: &mut T) -> Result<QueryOutcome, LookupError> {
    let encoded = build_query(query.id, &query.name, query.qtype)?;

    let mut retries_used = 0;
    let mut state = State::Idle;
    let mut datagram = BytePacketBuffer::new();

    loop {
        match state {
            State::Idle => {
                debug!(
                    "sending query {:#06x} for {} to {}:{}",
                    query.id, query.name, query.server, query.port
                );
                transport.send(&encoded)?;
                let now = Instant::now();
                state = State::Sent {
                    sent_at: now,
                    deadline: now + query.timeout,
                };
            }
            State::Sent { sent_at, deadline } => {
                let now = Instant::now();
                if now >= deadline {
                    state = State::TimedOut;
                    continue;
                }

                match transport.recv(&mut datagram.buf, deadline - now)? {
                    None => {
                        state = State::TimedOut;
                    }
                    Some(len) => {
                        datagram.len = len;
                        datagram.pos = 0;
                        debug!("received {} bytes", len);

                        // A stray or undecodable datagram is not a reply;
                        // keep waiting on the same clock
                        if let Some(packet) = accept_reply(query, &mut datagram) {
                            return Ok(classify(packet, sent_at.elapsed(), retries_used));
                        }
                    }
                }
            }
            State::TimedOut => {
                if retries_used == query.max_retries {
                    return Ok(QueryOutcome::NoResponse { retries_used });
                }

                retries_used += 1;
                debug!(
                    "timed out, retrying ({}/{})",
                    retries_used, query.max_retries
                );
                transport.send(&encoded)?;
                let now = Instant::now();
                state = State::Sent {
                    sent_at: now,
                    deadline: now + query.timeout,
                };
            }
        }
    }
}

/// Decodes a datagram and checks it against the outstanding query. A
/// mismatched transaction id, a question section that does not echo the
/// request, or a fatal decode error all disqualify the datagram.
fn accept_reply(query: &Query, datagram: &mut BytePacketBuffer) -> Option<DnsPacket> {
    let packet = match DnsPacket::from_buffer(datagram) {
        Ok(packet) => packet,
        Err(e) => {
            warn!("discarding undecodable datagram: {}", e);
            return None;
        }
    };

    if packet.header.id != query.id {
        warn!(
            "discarding datagram with transaction id {:#06x}, expected {:#06x}",
            packet.header.id, query.id
        );
        return None;
    }

    if !echoes_question(query, &packet) {
        warn!("discarding reply whose question does not echo the request");
        return None;
    }

    Some(packet)
}

fn echoes_question(query: &Query, packet: &DnsPacket) -> bool {
    if packet.questions.len() != 1 {
        return false;
    }

    let question = &packet.questions[0];
    question.qtype == query.qtype && question.name.eq_ignore_ascii_case(&query.name)
}

fn classify(packet: DnsPacket, elapsed: Duration, retries_used: u32) -> QueryOutcome {
    if packet.header.rescode != 0 {
        return QueryOutcome::ServerError {
            code: packet.header.rescode,
            elapsed,
            retries_used,
        };
    }

    if packet.answers.is_empty() {
        return QueryOutcome::NotFound {
            elapsed,
            retries_used,
        };
    }

    QueryOutcome::Answered {
        packet,
        elapsed,
        retries_used,
    }
}
