use proptest::prelude::*;

use matrixkit_communication::protocol::{ExtronProtocol, LightwareProtocol, Protocol};
use matrixkit_core::{RouteMap, Tie};

fn tie() -> impl Strategy<Value = Tie> {
    (1u32..=64, 1u32..=64).prop_map(|(input, output)| Tie::new(input, output))
}

// Pull the numbers back out of a `{input@output}` frame.
fn parse_bracket_frame(frame: &[u8]) -> Option<(u32, u32)> {
    let line = std::str::from_utf8(frame).ok()?.strip_suffix("\r\n")?;
    let body = line.strip_prefix('{')?.strip_suffix('}')?;
    let (input, output) = body.split_once('@')?;
    Some((input.parse().ok()?, output.parse().ok()?))
}

// Pull the numbers back out of a `input*output!` frame.
fn parse_star_frame(frame: &[u8]) -> Option<(u32, u32)> {
    let body = std::str::from_utf8(frame).ok()?.strip_suffix('!')?;
    let (input, output) = body.split_once('*')?;
    Some((input.parse().ok()?, output.parse().ok()?))
}

proptest! {
    #[test]
    fn lightware_frames_parse_back(tie in tie()) {
        let frame = LightwareProtocol.encode_single(tie);
        prop_assert_eq!(parse_bracket_frame(&frame), Some((tie.input, tie.output)));
    }

    #[test]
    fn extron_frames_parse_back(tie in tie()) {
        let frame = ExtronProtocol.encode_single(tie);
        prop_assert_eq!(parse_star_frame(&frame), Some((tie.input, tie.output)));
    }

    #[test]
    fn extron_group_wraps_the_single_frames(ties in prop::collection::vec(tie(), 1..8)) {
        let mut expected = b"\x1b+Q".to_vec();
        for tie in &ties {
            expected.extend_from_slice(&ExtronProtocol.encode_single(*tie));
        }
        expected.extend_from_slice(b"\r\n");
        prop_assert_eq!(ExtronProtocol.encode_multi(&ties), expected);
    }

    #[test]
    fn lightware_group_is_the_frames_back_to_back(ties in prop::collection::vec(tie(), 1..8)) {
        let mut expected = Vec::new();
        for tie in &ties {
            expected.extend_from_slice(&LightwareProtocol.encode_single(*tie));
        }
        prop_assert_eq!(LightwareProtocol.encode_multi(&ties), expected);
    }

    #[test]
    fn reply_classification_never_panics(line in prop::collection::vec(any::<u8>(), 0..64)) {
        LightwareProtocol.on_receive(&line);
        ExtronProtocol.on_receive(&line);
    }

    #[test]
    fn extron_replies_classify_case_insensitively(line in "[ -~]{0,24}") {
        prop_assert_eq!(
            ExtronProtocol.on_receive(line.as_bytes()),
            ExtronProtocol.on_receive(line.to_ascii_uppercase().as_bytes())
        );
    }

    #[test]
    fn route_map_keeps_one_tie_per_output(assignments in prop::collection::vec(tie(), 0..32)) {
        let mut routes = RouteMap::default();
        for tie in &assignments {
            routes.assign(*tie);
        }

        for tie in routes.ties() {
            // the surviving input is the one assigned last
            let last = assignments.iter().rev().find(|a| a.output == tie.output);
            prop_assert_eq!(last.map(|a| a.input), Some(tie.input));
        }
        let mut outputs: Vec<u32> = routes.ties().iter().map(|t| t.output).collect();
        outputs.sort_unstable();
        outputs.dedup();
        prop_assert_eq!(outputs.len(), routes.len());
    }
}
