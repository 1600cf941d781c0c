//! HTTP transport tests against a loopback server with canned responses.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use startrace_query::facade::*;
use startrace_query::*;

// ============================================================================
// Loopback server
// ============================================================================

#[derive(Debug)]
struct Recorded {
    request_line: String,
    body: String,
}

struct Canned {
    status: u16,
    body: &'static str,
}

fn ok(body: &'static str) -> Canned {
    Canned { status: 200, body }
}

/// Serve each canned response to one connection, in order.
fn serve(responses: Vec<Canned>) -> (String, mpsc::Receiver<Recorded>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    let addr = listener.local_addr().expect("local addr").to_string();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for canned in responses {
            let (stream, _) = match listener.accept() {
                Ok(conn) => conn,
                Err(_) => return,
            };
            if let Some(recorded) = answer(stream, &canned) {
                let _ = tx.send(recorded);
            }
        }
    });
    (addr, rx)
}

fn answer(mut stream: TcpStream, canned: &Canned) -> Option<Recorded> {
    stream.set_read_timeout(Some(Duration::from_secs(5))).ok();
    let mut reader = BufReader::new(stream.try_clone().ok()?);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).ok()?;

    let reason = if canned.status < 400 { "OK" } else { "Error" };
    let response = format!(
        "HTTP/1.1 {} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        canned.status,
        canned.body.len(),
        canned.body
    );
    stream.write_all(response.as_bytes()).ok()?;
    stream.flush().ok();

    Some(Recorded {
        request_line: request_line.trim_end().to_string(),
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

fn client_for(addr: &str) -> HttpTransport {
    let mut config = ClientConfig::new(Uri::from_address(addr).unwrap());
    config.connect_timeout = Duration::from_secs(2);
    config.request_timeout = Duration::from_secs(5);
    HttpTransport::new(&config).unwrap()
}

fn stargazer() -> Collection {
    Index::new("repository")
        .unwrap()
        .collection("stargazer")
        .unwrap()
}

// ============================================================================
// Schema
// ============================================================================

#[test]
fn test_schema_lookup() {
    let (addr, rx) = serve(vec![ok(
        r#"{"indexes":[{"name":"repository","frames":[{"name":"stargazer"},{"name":"language"}]}]}"#,
    )]);
    let client = client_for(&addr);

    let schema = client.schema().unwrap();
    assert!(schema.has_collection("repository", "stargazer"));
    assert!(schema.has_collection("repository", "language"));
    assert_eq!(schema.index_names().collect::<Vec<_>>(), vec!["repository"]);

    let recorded = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(recorded.request_line, "GET /schema HTTP/1.1");
}

// ============================================================================
// Result shapes
// ============================================================================

#[test]
fn test_bitmap_query_sends_pql() {
    let (addr, rx) = serve(vec![ok(r#"{"results":[{"attrs":{},"bits":[2,3]}]}"#)]);
    let client = client_for(&addr);
    let s = stargazer();

    let both = intersect([s.bitmap(14), s.bitmap(19)]).unwrap();
    let bits = decode_bitmap(&execute(&client, &both).unwrap()).unwrap();
    assert_eq!(bits.to_vec(), vec![2, 3]);

    let recorded = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(
        recorded.request_line,
        "POST /index/repository/query HTTP/1.1"
    );
    assert_eq!(
        recorded.body,
        "Intersect(Bitmap(rowID=14, frame='stargazer'), Bitmap(rowID=19, frame='stargazer'))"
    );
}

#[test]
fn test_empty_bitmap_result() {
    let (addr, _rx) = serve(vec![ok(r#"{"results":[[]]}"#)]);
    let client = client_for(&addr);

    let bits = decode_bitmap(&execute(&client, &stargazer().bitmap(7)).unwrap()).unwrap();
    assert!(bits.is_empty());
}

#[test]
fn test_top_n_count_and_mutation_results() {
    let (addr, rx) = serve(vec![
        ok(r#"{"results":[[{"id":1,"count":3},{"id":2,"count":1}]]}"#),
        ok(r#"{"results":[4]}"#),
        ok(r#"{"results":[true]}"#),
    ]);
    let client = client_for(&addr);
    let s = stargazer();

    let ranked = decode_top_n(&execute(&client, &top_n(&s, 5)).unwrap()).unwrap();
    assert_eq!(
        ranked,
        vec![CountItem { id: 1, count: 3 }, CountItem { id: 2, count: 1 }]
    );

    let total = count(union([s.bitmap(14), s.bitmap(19)]).unwrap());
    assert_eq!(decode_count(&execute(&client, &total).unwrap()).unwrap(), 4);

    let changed = decode_changed(&execute(&client, &set_bit(&s, 99999, 77777)).unwrap()).unwrap();
    assert!(changed);

    let bodies: Vec<String> = rx.iter().take(3).map(|r| r.body).collect();
    assert_eq!(
        bodies,
        vec![
            "TopN(frame='stargazer', n=5)".to_string(),
            "Count(Union(Bitmap(rowID=14, frame='stargazer'), Bitmap(rowID=19, frame='stargazer')))"
                .to_string(),
            "SetBit(rowID=99999, frame='stargazer', columnID=77777)".to_string(),
        ]
    );
}

#[test]
fn test_query_options_become_url_flags() {
    let (addr, rx) = serve(vec![ok(
        r#"{"results":[{"attrs":{},"bits":[]}],"columnAttrs":[{"id":2,"attrs":{"stars":10}}]}"#,
    )]);
    let client = client_for(&addr);
    let options = QueryOptions {
        column_attrs: true,
        exclude_bits: true,
        ..QueryOptions::default()
    };

    let response = execute_with(&client, &stargazer().bitmap(14), &options).unwrap();
    assert_eq!(response.column_attributes().len(), 1);
    assert_eq!(response.column_attributes()[0].id, 2);

    let recorded = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(
        recorded.request_line,
        "POST /index/repository/query?columnAttrs=true&excludeBits=true HTTP/1.1"
    );
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_server_error_maps_to_status() {
    let (addr, _rx) = serve(vec![Canned {
        status: 400,
        body: r#"{"error":"frame not found"}"#,
    }]);
    let client = client_for(&addr);

    let err = execute(&client, &stargazer().bitmap(1)).unwrap_err();
    assert_eq!(err.status(), Some(400));
    match err {
        QueryError::Transport {
            source: TransportError::Server { message, .. },
            ..
        } => assert_eq!(message, "frame not found"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_invalid_json_maps_to_invalid_response() {
    let (addr, _rx) = serve(vec![ok("not json")]);
    let client = client_for(&addr);

    let err = execute(&client, &stargazer().bitmap(1)).unwrap_err();
    assert!(matches!(
        err,
        QueryError::Transport {
            source: TransportError::InvalidResponse(_),
            ..
        }
    ));
}

#[test]
fn test_connection_refused_maps_to_http() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().to_string()
    };
    let client = client_for(&addr);

    let err = client.schema().unwrap_err();
    assert!(matches!(err, TransportError::Http(_)));
}
