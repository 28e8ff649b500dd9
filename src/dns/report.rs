//! Renders query outcomes as the operator-facing report. Records are
//! printed in the exact order they appeared on the wire, which is the
//! server's priority signal (MX ordering in particular).

use std::fmt::Write;
use std::time::Duration;

use crate::dns::client::{Query, QueryOutcome};
use crate::dns::protocol::{RecordData, ResourceRecord};

pub fn render_request(query: &Query) -> String {
    format!(
        "DnsClient sending request for {}\nServer: {}\nRequest type: {}\n\n",
        query.name, query.server, query.qtype
    )
}

pub fn render(outcome: &QueryOutcome) -> String {
    match *outcome {
        QueryOutcome::Answered {
            ref packet,
            elapsed,
            retries_used,
        } => {
            let mut out = response_line(elapsed, retries_used);

            if !packet.header.recursion_available {
                out.push_str(
                    "ERROR\tUnexpected response: DNS Server does not support recursive queries\n",
                );
            }

            let auth = if packet.header.authoritative_answer {
                "auth"
            } else {
                "nonauth"
            };

            let _ = writeln!(
                out,
                "***Answer Section ({} records)***\n",
                packet.answers.len()
            );
            for record in &packet.answers {
                let _ = writeln!(out, "{}", format_record(record, auth));
            }

            if !packet.authorities.is_empty() {
                let _ = writeln!(
                    out,
                    "\n***Authority Section ({} records)***\n",
                    packet.authorities.len()
                );
                for record in &packet.authorities {
                    let _ = writeln!(out, "{}", format_record(record, auth));
                }
            }

            if !packet.resources.is_empty() {
                let _ = writeln!(
                    out,
                    "\n***Additional Section ({} records)***\n",
                    packet.resources.len()
                );
                for record in &packet.resources {
                    let _ = writeln!(out, "{}", format_record(record, auth));
                }
            }

            out
        }
        QueryOutcome::NotFound {
            elapsed,
            retries_used,
        } => {
            let mut out = response_line(elapsed, retries_used);
            out.push_str("***Answer Section (0 records)***\n\nNOTFOUND\n");
            out
        }
        QueryOutcome::ServerError {
            code,
            elapsed,
            retries_used,
        } => {
            let mut out = response_line(elapsed, retries_used);
            out.push_str(&rescode_line(code));
            out
        }
        QueryOutcome::NoResponse { retries_used } => format!(
            "ERROR\tMaximum number of retries {} exceeded\n",
            retries_used
        ),
    }
}

fn response_line(elapsed: Duration, retries_used: u32) -> String {
    format!(
        "Response received after {:.3} seconds ({} retries)\n\n",
        elapsed.as_secs_f64(),
        retries_used
    )
}

fn rescode_line(code: u8) -> String {
    match code {
        1 => "ERROR\tFormat error: the name server was unable to interpret the query\n".to_string(),
        2 => "ERROR\tServer failure: the name server was unable to process this query due to a problem with the name server\n".to_string(),
        3 => "NOTFOUND\n".to_string(),
        4 => "ERROR\tNot implemented: the name server does not support the requested kind of query\n".to_string(),
        5 => "ERROR\tRefused: the name server refuses to perform the requested operation for policy reasons\n".to_string(),
        _ => format!("ERROR\tServer returned response code {}\n", code),
    }
}

fn format_record(record: &ResourceRecord, auth: &str) -> String {
    match record.data {
        RecordData::A(ref addr) => format!("IP\t{}\t{}\t{}", addr, record.ttl, auth),
        RecordData::NS(ref host) => format!("NS\t{}\t{}\t{}", host, record.ttl, auth),
        RecordData::CNAME(ref host) => format!("CNAME\t{}\t{}\t{}", host, record.ttl, auth),
        RecordData::MX {
            preference,
            ref exchange,
        } => format!(
            "MX\t{}\t{}\t{}\t{}",
            exchange, preference, record.ttl, auth
        ),
        RecordData::UNKNOWN { qtype, ref data } => format!(
            "TYPE {}\tData: {:?}\t{}\t{}",
            qtype, data, record.ttl, auth
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::Ipv4Addr;

    use crate::dns::protocol::{DnsPacket, QueryType, CLASS_IN};

    fn record(data: RecordData) -> ResourceRecord {
        ResourceRecord {
            name: "www.mcgill.ca".to_string(),
            class: CLASS_IN,
            ttl: 300,
            data,
        }
    }

    fn answered(packet: DnsPacket) -> QueryOutcome {
        QueryOutcome::Answered {
            packet,
            elapsed: Duration::from_millis(42),
            retries_used: 0,
        }
    }

    #[test]
    fn test_render_request_banner() {
        let query = Query {
            id: 1,
            name: "www.mcgill.ca".to_string(),
            qtype: QueryType::MX,
            server: Ipv4Addr::new(8, 8, 8, 8),
            port: 53,
            timeout: Duration::from_secs(5),
            max_retries: 3,
        };

        assert_eq!(
            "DnsClient sending request for www.mcgill.ca\nServer: 8.8.8.8\nRequest type: MX\n\n",
            render_request(&query)
        );
    }

    #[test]
    fn test_render_a_record() {
        let mut packet = DnsPacket::new();
        packet.header.authoritative_answer = true;
        packet.header.recursion_available = true;
        packet
            .answers
            .push(record(RecordData::A(Ipv4Addr::new(132, 206, 6, 95))));

        let out = render(&answered(packet));
        assert!(out.starts_with("Response received after 0.042 seconds (0 retries)\n"));
        assert!(out.contains("***Answer Section (1 records)***"));
        assert!(out.contains("IP\t132.206.6.95\t300\tauth"));
    }

    #[test]
    fn test_render_mx_record_shows_preference() {
        let mut packet = DnsPacket::new();
        packet.header.authoritative_answer = true;
        packet.header.recursion_available = true;
        packet.answers.push(record(RecordData::MX {
            preference: 10,
            exchange: "mail.mcgill.ca".to_string(),
        }));

        let out = render(&answered(packet));
        assert!(out.contains("MX\tmail.mcgill.ca\t10\t300\tauth"));
    }

    #[test]
    fn test_render_marks_nonauthoritative_answers() {
        let mut packet = DnsPacket::new();
        packet.header.recursion_available = true;
        packet
            .answers
            .push(record(RecordData::CNAME("web.mcgill.ca".to_string())));

        let out = render(&answered(packet));
        assert!(out.contains("CNAME\tweb.mcgill.ca\t300\tnonauth"));
    }

    #[test]
    fn test_render_warns_when_recursion_unavailable() {
        let mut packet = DnsPacket::new();
        packet
            .answers
            .push(record(RecordData::A(Ipv4Addr::new(10, 0, 0, 1))));

        let out = render(&answered(packet));
        assert!(out.contains("does not support recursive queries"));
    }

    #[test]
    fn test_render_additional_section() {
        let mut packet = DnsPacket::new();
        packet.header.recursion_available = true;
        packet
            .answers
            .push(record(RecordData::NS("ns1.mcgill.ca".to_string())));
        packet
            .resources
            .push(record(RecordData::A(Ipv4Addr::new(132, 206, 44, 69))));

        let out = render(&answered(packet));
        assert!(out.contains("***Additional Section (1 records)***"));
        assert!(out.contains("IP\t132.206.44.69\t300\tnonauth"));
    }

    #[test]
    fn test_render_not_found() {
        let out = render(&QueryOutcome::NotFound {
            elapsed: Duration::from_millis(10),
            retries_used: 1,
        });

        assert!(out.starts_with("Response received after 0.010 seconds (1 retries)\n"));
        assert!(out.contains("NOTFOUND"));
    }

    #[test]
    fn test_render_nxdomain_as_not_found_text() {
        let out = render(&QueryOutcome::ServerError {
            code: 3,
            elapsed: Duration::from_millis(10),
            retries_used: 0,
        });

        assert!(out.ends_with("NOTFOUND\n"));
        assert!(!out.contains("ERROR"));
    }

    #[test]
    fn test_render_server_failure() {
        let out = render(&QueryOutcome::ServerError {
            code: 2,
            elapsed: Duration::from_millis(10),
            retries_used: 0,
        });

        assert!(out.contains("ERROR\tServer failure"));
    }

    #[test]
    fn test_render_no_response() {
        let out = render(&QueryOutcome::NoResponse { retries_used: 3 });

        assert_eq!("ERROR\tMaximum number of retries 3 exceeded\n", out);
    }
}
