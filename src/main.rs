mod dns;

use std::env;
use std::net::Ipv4Addr;
use std::process;
use std::time::Duration;

use getopts::Options;
use rand::random;

use crate::dns::client::{lookup, Query, QueryOutcome};
use crate::dns::protocol::QueryType;
use crate::dns::report;
use crate::dns::udp::DnsUdpTransport;

const USAGE: &str = "usage: dnsq [-t SECS] [-r COUNT] [-p PORT] [--mx|--ns] @server name";

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let query = match parse_args(&args[1..]) {
        Ok(query) => query,
        Err(msg) => {
            println!("ERROR\t{}", msg);
            println!("{}", USAGE);
            process::exit(1);
        }
    };

    print!("{}", report::render_request(&query));

    let mut transport = match DnsUdpTransport::new(query.server, query.port) {
        Ok(transport) => transport,
        Err(e) => {
            println!("ERROR\t{}", e);
            process::exit(1);
        }
    };

    match lookup(&query, &mut transport) {
        Ok(outcome) => {
            print!("{}", report::render(&outcome));
            if let QueryOutcome::NoResponse { .. } = outcome {
                process::exit(1);
            }
        }
        Err(e) => {
            println!("ERROR\t{}", e);
            process::exit(1);
        }
    }
}

fn parse_args(args: &[String]) -> Result<Query, String> {
    let mut opts = Options::new();
    opts.optopt("t", "timeout", "seconds to wait for each reply", "SECS");
    opts.optopt("r", "retries", "maximum number of retries on timeout", "COUNT");
    opts.optopt("p", "port", "server port", "PORT");
    opts.optflag("", "mx", "query for mail exchange records");
    opts.optflag("", "ns", "query for name server records");

    let matches = opts.parse(args).map_err(|e| e.to_string())?;

    let timeout = match matches.opt_str("t") {
        Some(s) => {
            let secs = s
                .parse::<f64>()
                .map_err(|_| format!("invalid timeout: {}", s))?;
            if !(secs > 0.0) {
                return Err(format!("invalid timeout: {}", s));
            }
            secs
        }
        None => 5.0,
    };

    let max_retries = match matches.opt_str("r") {
        Some(s) => s
            .parse::<u32>()
            .map_err(|_| format!("invalid retry count: {}", s))?,
        None => 3,
    };

    let port = match matches.opt_str("p") {
        Some(s) => s
            .parse::<u16>()
            .map_err(|_| format!("invalid port: {}", s))?,
        None => 53,
    };

    let qtype = match (matches.opt_present("mx"), matches.opt_present("ns")) {
        (true, true) => return Err("cannot specify both --mx and --ns".to_string()),
        (true, false) => QueryType::MX,
        (false, true) => QueryType::NS,
        (false, false) => QueryType::A,
    };

    let mut server = None;
    let mut name = None;
    for arg in &matches.free {
        if let Some(addr) = arg.strip_prefix('@') {
            if server.is_some() {
                return Err(format!("unexpected argument: {}", arg));
            }
            server = Some(addr.parse::<Ipv4Addr>().map_err(|_| {
                "invalid DNS server: expected an IPv4 address like @8.8.8.8".to_string()
            })?);
        } else if name.is_none() {
            name = Some(arg.clone());
        } else {
            return Err(format!("unexpected argument: {}", arg));
        }
    }

    let server = server.ok_or_else(|| "missing server argument (@server)".to_string())?;
    let name = name.ok_or_else(|| "missing name argument".to_string())?;

    Ok(Query {
        id: random::<u16>(),
        name,
        qtype,
        server,
        port,
        timeout: Duration::from_secs_f64(timeout),
        max_retries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args_defaults() {
        let query = parse_args(&args(&["@8.8.8.8", "www.mcgill.ca"])).unwrap();

        assert_eq!("www.mcgill.ca", query.name);
        assert_eq!(Ipv4Addr::new(8, 8, 8, 8), query.server);
        assert_eq!(QueryType::A, query.qtype);
        assert_eq!(53, query.port);
        assert_eq!(Duration::from_secs(5), query.timeout);
        assert_eq!(3, query.max_retries);
    }

    #[test]
    fn test_parse_args_full() {
        let query = parse_args(&args(&[
            "-t", "2.5", "-r", "1", "-p", "5353", "--mx", "@132.206.44.69", "mcgill.ca",
        ]))
        .unwrap();

        assert_eq!(QueryType::MX, query.qtype);
        assert_eq!(5353, query.port);
        assert_eq!(Duration::from_secs_f64(2.5), query.timeout);
        assert_eq!(1, query.max_retries);
    }

    #[test]
    fn test_parse_args_rejects_bad_server() {
        assert!(parse_args(&args(&["@not-an-ip", "mcgill.ca"])).is_err());
        assert!(parse_args(&args(&["@256.0.0.1", "mcgill.ca"])).is_err());
    }

    #[test]
    fn test_parse_args_rejects_missing_arguments() {
        assert!(parse_args(&args(&["@8.8.8.8"])).is_err());
        assert!(parse_args(&args(&["mcgill.ca"])).is_err());
    }

    #[test]
    fn test_parse_args_rejects_conflicting_types() {
        assert!(parse_args(&args(&["--mx", "--ns", "@8.8.8.8", "mcgill.ca"])).is_err());
    }

    #[test]
    fn test_parse_args_rejects_nonpositive_timeout() {
        assert!(parse_args(&args(&["-t", "0", "@8.8.8.8", "mcgill.ca"])).is_err());
        assert!(parse_args(&args(&["-t", "-1", "@8.8.8.8", "mcgill.ca"])).is_err());
    }
}
