// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use parking_lot::Mutex;

struct RecordingObserver {
    lines: Mutex<Vec<(String, String)>>,
}

impl RecordingObserver {
    fn new() -> Self {
        Self {
            lines: Mutex::new(Vec::new()),
        }
    }
}

impl OutputObserver for RecordingObserver {
    fn on_line(&self, session: &SessionName, line: &str) {
        self.lines
            .lock()
            .push((session.as_str().to_string(), line.to_string()));
    }
}

#[test]
fn input_frames_are_recognised_by_first_byte() {
    assert!(is_input_frame(&ClientMessage::Binary(vec![
        INPUT_COMMAND,
        b'a'
    ])));
    assert!(is_input_frame(&ClientMessage::Text("0ls".to_string())));

    assert!(!is_input_frame(&ClientMessage::Binary(vec![
        OUTPUT_COMMAND,
        b'a'
    ])));
    assert!(!is_input_frame(&ClientMessage::Binary(vec![])));
    assert!(!is_input_frame(&ClientMessage::Ping(vec![INPUT_COMMAND])));
}

#[test]
fn output_frames_feed_the_observer_line_by_line() {
    let observer = RecordingObserver::new();
    let session = SessionName::new("demo").unwrap();
    let mut lines = LineBuffer::default();

    let frame = UpstreamMessage::Binary(b"1build ok\npart".to_vec().into());
    observe_output(&frame, &mut lines, &observer, &session);
    let frame = UpstreamMessage::Binary(b"1ial done\n".to_vec().into());
    observe_output(&frame, &mut lines, &observer, &session);

    let seen = observer.lines.lock();
    assert_eq!(
        *seen,
        vec![
            ("demo".to_string(), "build ok".to_string()),
            ("demo".to_string(), "partial done".to_string()),
        ]
    );
}

#[test]
fn non_output_frames_are_not_observed() {
    let observer = RecordingObserver::new();
    let session = SessionName::new("demo").unwrap();
    let mut lines = LineBuffer::default();

    // Input-command byte and ping frames never reach the observer.
    observe_output(
        &UpstreamMessage::Binary(b"0typed\n".to_vec().into()),
        &mut lines,
        &observer,
        &session,
    );
    observe_output(
        &UpstreamMessage::Ping(b"1x\n".to_vec().into()),
        &mut lines,
        &observer,
        &session,
    );

    assert!(observer.lines.lock().is_empty());
    assert!(lines.pending().is_empty());
}

#[test]
fn close_frames_round_trip_code_and_reason() {
    let client_frame = CloseFrame {
        code: 4001,
        reason: "done".into(),
    };
    let upstream = to_upstream_close(client_frame);
    assert_eq!(u16::from(upstream.code), 4001);
    assert_eq!(upstream.reason.as_str(), "done");

    let back = to_client_close(upstream);
    assert_eq!(back.code, 4001);
    assert_eq!(back.reason, "done");
}

#[test]
fn missing_close_frame_becomes_normal_close() {
    assert_eq!(u16::from(normal_upstream_close().code), 1000);
    assert_eq!(normal_client_close().code, 1000);
}

#[test]
fn binary_frames_convert_losslessly_in_both_directions() {
    let payload = vec![OUTPUT_COMMAND, 0x00, 0xff, 0x7f];
    let up = to_upstream(ClientMessage::Binary(payload.clone())).unwrap();
    match &up {
        UpstreamMessage::Binary(b) => assert_eq!(b.as_ref(), payload.as_slice()),
        other => panic!("unexpected conversion: {other:?}"),
    }
    let down = to_client(up).unwrap();
    match down {
        ClientMessage::Binary(b) => assert_eq!(b, payload),
        other => panic!("unexpected conversion: {other:?}"),
    }
}

#[test]
fn close_messages_do_not_convert_as_data() {
    assert!(to_upstream(ClientMessage::Close(None)).is_none());
    assert!(to_client(UpstreamMessage::Close(None)).is_none());
}
