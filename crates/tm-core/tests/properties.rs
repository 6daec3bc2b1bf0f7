//! Properties that must hold for any input, checked with proptest.

use std::time::Duration;

use proptest::prelude::*;
use sipr_sip_msg::SipMsg;
use sipr_tm_core::dialog::{DialogState, new_dlg_uac};
use sipr_tm_core::transaction::CellId;
use sipr_tm_core::{MessageBuilder, Proto, RetrTier, SharedArena, SocketInfo, TimerSettings};

fn rank(state: DialogState) -> u8 {
    match state {
        DialogState::New => 0,
        DialogState::Early => 1,
        DialogState::Confirmed => 2,
        DialogState::Destroyed => 3,
    }
}

proptest! {
    #[test]
    fn dialog_state_never_moves_backwards(
        steps in prop::collection::vec((100u16..700, any::<bool>(), any::<bool>()), 1..20)
    ) {
        let arena = SharedArena::unbounded();
        let mut dlg = new_dlg_uac(b"c", b"l", 1, b"sip:a@x", b"sip:b@y", &arena).unwrap();

        for (code, early, invite) in steps {
            let before = dlg.state();
            if early {
                let _ = dlg.enter_early();
            }
            let method = if invite { "INVITE" } else { "BYE" };
            let reply = format!("SIP/2.0 {code} X\r\nCSeq: 1 {method}\r\n\r\n");
            let result = dlg.dlg_response_uac(&SipMsg::scan(reply.as_bytes()).unwrap());

            if before == DialogState::Destroyed {
                prop_assert!(result.is_err());
                prop_assert_eq!(dlg.state(), DialogState::Destroyed);
            }
            prop_assert!(rank(dlg.state()) >= rank(before));
        }
    }

    #[test]
    fn retransmission_intervals_never_shrink(t1 in 1u64..5_000, extra in 0u64..10_000) {
        let settings = TimerSettings {
            t1: Duration::from_millis(t1),
            t2: Duration::from_millis(t1 + extra),
            ..TimerSettings::default()
        };
        let mut tier = RetrTier::T1To1;
        let mut previous = tier.interval(&settings);
        for _ in 0..6 {
            let next = tier.next();
            prop_assert!(next >= tier);
            let interval = next.interval(&settings);
            prop_assert!(interval >= previous);
            prop_assert!(interval <= settings.t2);
            previous = interval;
            tier = next;
        }
        prop_assert_eq!(tier, RetrTier::T2);
    }

    #[test]
    fn uac_request_length_matches_content(
        seq in 1u32..u32::MAX,
        method in prop::sample::select(vec!["INVITE", "BYE", "INFO", "MESSAGE"]),
        body in prop::collection::vec(b'a'..=b'z', 0..64),
        remote_tag in prop::option::of("[a-z0-9]{1,12}"),
    ) {
        let arena = SharedArena::unbounded();
        let mut dlg = new_dlg_uac(b"cid@a", b"lt", seq, b"sip:alice@a", b"sip:bob@b", &arena).unwrap();
        if let Some(tag) = &remote_tag {
            dlg.remote_tag = Some(arena.dup(tag.as_bytes()).unwrap());
        }
        let builder = MessageBuilder::new(arena.clone(), true, None);
        let sock = SocketInfo::new("10.0.0.1:5060".parse().unwrap(), Proto::Udp);
        let id = CellId { hash_index: 3, label: 9 };

        let request = builder
            .build_uac_req(method.as_bytes(), b"", &body, &dlg, id, "", 0, &sock)
            .unwrap();
        let msg = SipMsg::scan(&request.buffer).unwrap();
        let cseq = msg.cseq().unwrap().unwrap();
        prop_assert_eq!(cseq.number, seq);
        prop_assert_eq!(cseq.method, method.as_bytes());
        prop_assert_eq!(msg.body, &body[..]);
        let to = sipr_sip_msg::NameAddr::parse(msg.to().unwrap().body).unwrap();
        prop_assert_eq!(to.tag, remote_tag.as_deref().map(str::as_bytes));
        let cseq_n = format!("CSeq: {seq}");
        prop_assert_eq!(request.headers.cseq_n.as_bytes(), cseq_n.as_bytes());
    }
}
