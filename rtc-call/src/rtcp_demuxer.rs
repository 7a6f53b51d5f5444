use crate::rtcp_packet_sink::{RtcpPacketSink, SinkHandle};
use crate::ssrc_binding_observer::SsrcBindingObserver;
use crate::stream_id::{is_legal_mid_name, is_legal_rsid_name};
use log::{debug, trace};
use rtcp::parse_rtcp_packet_sender_ssrc;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

type SinkMap<K> = BTreeMap<K, Vec<SinkHandle>>;

/// Routes inbound RTCP packets to sinks by sender SSRC.
///
/// Sinks may also be registered under an RSID, a MID, a MID+RSID pair or a
/// payload type. Such a sink receives nothing until the key is bound to an
/// SSRC, at which point it is added as a sink of that SSRC as well. Those
/// bindings are never dropped automatically.
///
/// Every sink must be removed before the demuxer is dropped.
#[derive(Default)]
pub struct RtcpDemuxer {
    ssrc_sinks: SinkMap<u32>,
    rsid_sinks: SinkMap<String>,
    mid_sinks: SinkMap<String>,
    mid_rsid_sinks: SinkMap<(String, String)>,
    payload_type_sinks: SinkMap<u8>,
    broadcast_sinks: Vec<SinkHandle>,
}

impl RtcpDemuxer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `sink` for packets whose sender SSRC is `sender_ssrc`.
    pub fn add_sink(&mut self, sender_ssrc: u32, sink: Arc<dyn RtcpPacketSink>) {
        debug_assert!(!self.is_broadcast_sink(&sink), "broadcast sink added as keyed sink");
        add_sink_to_map(&mut self.ssrc_sinks, sender_ssrc, &sink);
    }

    /// Registers `sink` for the stream carrying `rsid`.
    pub fn add_rsid_sink(&mut self, rsid: &str, sink: Arc<dyn RtcpPacketSink>) {
        debug_assert!(is_legal_rsid_name(rsid), "illegal rsid {rsid:?}");
        debug_assert!(!self.is_broadcast_sink(&sink), "broadcast sink added as keyed sink");
        add_sink_to_map(&mut self.rsid_sinks, rsid.to_owned(), &sink);
    }

    /// Registers `sink` for the streams carrying `mid`.
    pub fn add_mid_sink(&mut self, mid: &str, sink: Arc<dyn RtcpPacketSink>) {
        debug_assert!(is_legal_mid_name(mid), "illegal mid {mid:?}");
        debug_assert!(!self.is_broadcast_sink(&sink), "broadcast sink added as keyed sink");
        add_sink_to_map(&mut self.mid_sinks, mid.to_owned(), &sink);
    }

    /// Registers `sink` for the stream carrying both `mid` and `rsid`.
    pub fn add_mid_rsid_sink(&mut self, mid: &str, rsid: &str, sink: Arc<dyn RtcpPacketSink>) {
        debug_assert!(is_legal_mid_name(mid), "illegal mid {mid:?}");
        debug_assert!(is_legal_rsid_name(rsid), "illegal rsid {rsid:?}");
        debug_assert!(!self.is_broadcast_sink(&sink), "broadcast sink added as keyed sink");
        add_sink_to_map(
            &mut self.mid_rsid_sinks,
            (mid.to_owned(), rsid.to_owned()),
            &sink,
        );
    }

    /// Registers `sink` for the streams using `payload_type`.
    pub fn add_payload_type_sink(&mut self, payload_type: u8, sink: Arc<dyn RtcpPacketSink>) {
        debug_assert!(!self.is_broadcast_sink(&sink), "broadcast sink added as keyed sink");
        add_sink_to_map(&mut self.payload_type_sinks, payload_type, &sink);
    }

    /// Registers `sink` for every packet, parseable or not. A broadcast sink
    /// may not also be registered under any key.
    pub fn add_broadcast_sink(&mut self, sink: Arc<dyn RtcpPacketSink>) {
        debug_assert!(
            !map_has_value(&self.ssrc_sinks, &sink)
                && !map_has_value(&self.rsid_sinks, &sink)
                && !map_has_value(&self.mid_sinks, &sink)
                && !map_has_value(&self.mid_rsid_sinks, &sink)
                && !map_has_value(&self.payload_type_sinks, &sink),
            "keyed sink added as broadcast sink"
        );
        debug_assert!(!self.is_broadcast_sink(&sink), "broadcast sink added twice");
        if !self.is_broadcast_sink(&sink) {
            self.broadcast_sinks.push(SinkHandle::new(&sink));
        }
    }

    /// Removes `sink` from every keyed table, including SSRC rows created by
    /// bindings. The sink must have been registered under at least one key.
    pub fn remove_sink(&mut self, sink: &Arc<dyn RtcpPacketSink>) {
        let removal_count = remove_from_map_by_value(&mut self.ssrc_sinks, sink)
            + remove_from_map_by_value(&mut self.rsid_sinks, sink)
            + remove_from_map_by_value(&mut self.mid_sinks, sink)
            + remove_from_map_by_value(&mut self.mid_rsid_sinks, sink)
            + remove_from_map_by_value(&mut self.payload_type_sinks, sink);
        debug_assert!(removal_count > 0, "removed a sink that was never added");
        trace!("removed sink from {removal_count} table row(s)");
    }

    pub fn remove_broadcast_sink(&mut self, sink: &Arc<dyn RtcpPacketSink>) {
        let position = self.broadcast_sinks.iter().position(|s| s.is(sink));
        debug_assert!(position.is_some(), "removed a broadcast sink that was never added");
        if let Some(position) = position {
            self.broadcast_sinks.remove(position);
        }
    }

    /// Dispatches `packet` to the sinks of its sender SSRC, then to every
    /// broadcast sink. Packets without a parseable sender SSRC only reach
    /// broadcast sinks.
    pub fn on_rtcp_packet(&self, packet: &[u8]) {
        match parse_rtcp_packet_sender_ssrc(packet) {
            Some(sender_ssrc) => {
                if let Some(sinks) = self.ssrc_sinks.get(&sender_ssrc) {
                    trace!("rtcp from ssrc {sender_ssrc} to {} sink(s)", sinks.len());
                    for sink in sinks {
                        sink.on_rtcp_packet(packet);
                    }
                }
            }
            None => trace!("rtcp packet without sender ssrc, broadcast only"),
        }

        for sink in &self.broadcast_sinks {
            sink.on_rtcp_packet(packet);
        }
    }

    fn is_broadcast_sink(&self, sink: &Arc<dyn RtcpPacketSink>) -> bool {
        self.broadcast_sinks.iter().any(|s| s.is(sink))
    }
}

impl SsrcBindingObserver for RtcpDemuxer {
    fn on_ssrc_bound_to_rsid(&mut self, rsid: &str, ssrc: u32) {
        bind_sinks_to_ssrc(&mut self.ssrc_sinks, self.rsid_sinks.get(rsid), ssrc, &rsid);
    }

    fn on_ssrc_bound_to_mid(&mut self, mid: &str, ssrc: u32) {
        bind_sinks_to_ssrc(&mut self.ssrc_sinks, self.mid_sinks.get(mid), ssrc, &mid);
    }

    fn on_ssrc_bound_to_mid_rsid(&mut self, mid: &str, rsid: &str, ssrc: u32) {
        let key = (mid.to_owned(), rsid.to_owned());
        bind_sinks_to_ssrc(
            &mut self.ssrc_sinks,
            self.mid_rsid_sinks.get(&key),
            ssrc,
            &key,
        );
    }

    fn on_ssrc_bound_to_payload_type(&mut self, payload_type: u8, ssrc: u32) {
        bind_sinks_to_ssrc(
            &mut self.ssrc_sinks,
            self.payload_type_sinks.get(&payload_type),
            ssrc,
            &payload_type,
        );
    }
}

impl Drop for RtcpDemuxer {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        debug_assert!(self.ssrc_sinks.is_empty(), "ssrc sinks left at drop");
        debug_assert!(self.rsid_sinks.is_empty(), "rsid sinks left at drop");
        debug_assert!(self.mid_sinks.is_empty(), "mid sinks left at drop");
        debug_assert!(self.mid_rsid_sinks.is_empty(), "mid+rsid sinks left at drop");
        debug_assert!(self.payload_type_sinks.is_empty(), "payload type sinks left at drop");
        debug_assert!(self.broadcast_sinks.is_empty(), "broadcast sinks left at drop");
    }
}

fn add_sink_to_map<K: Ord>(map: &mut SinkMap<K>, key: K, sink: &Arc<dyn RtcpPacketSink>) {
    let sinks = map.entry(key).or_default();
    let exists = sinks.iter().any(|s| s.is(sink));
    debug_assert!(!exists, "sink added twice for the same key");
    if !exists {
        sinks.push(SinkHandle::new(sink));
    }
}

fn map_has_value<K>(map: &SinkMap<K>, sink: &Arc<dyn RtcpPacketSink>) -> bool {
    map.values().flatten().any(|s| s.is(sink))
}

fn remove_from_map_by_value<K: Ord>(map: &mut SinkMap<K>, sink: &Arc<dyn RtcpPacketSink>) -> usize {
    let mut removed = 0;
    map.retain(|_, sinks| {
        let before = sinks.len();
        sinks.retain(|s| !s.is(sink));
        removed += before - sinks.len();
        !sinks.is_empty()
    });
    removed
}

fn bind_sinks_to_ssrc<K: Debug + ?Sized>(
    ssrc_sinks: &mut SinkMap<u32>,
    sinks: Option<&Vec<SinkHandle>>,
    ssrc: u32,
    key: &K,
) {
    let Some(sinks) = sinks else {
        return;
    };

    for sink in sinks {
        let bound = ssrc_sinks.entry(ssrc).or_default();
        if !bound.contains(sink) {
            debug!("sink for {key:?} bound to ssrc {ssrc}");
            bound.push(sink.clone());
        }
    }
}
