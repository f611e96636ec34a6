//! Axum handler for the `announce` request.
//!
//! It resolves the peer contact address, applies the announce to the core
//! tracker and builds the response in the form the client asked for. All
//! protocol-level failures come back as bencoded `failure reason` bodies
//! with HTTP `200`.
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::{ConnectInfo, State};
use axum::response::{IntoResponse, Response};
use depot_tracker_clock::clock::Time;
use depot_tracker_primitives::announce_event::AnnounceEvent;
use depot_tracker_primitives::{peer, NumberOfBytes};
use tracing::debug;

use crate::core::{AnnounceData, Tracker};
use crate::servers::http::v1::extractors::announce_request::ExtractRequest;
use crate::servers::http::v1::requests::announce::{Announce, Compact, Event};
use crate::servers::http::v1::responses;
use crate::CurrentClock;

/// It handles the `announce` request.
#[allow(clippy::unused_async)]
pub async fn handle(
    State(tracker): State<Arc<Tracker>>,
    ExtractRequest(announce_request): ExtractRequest,
    ConnectInfo(client_addr): ConnectInfo<SocketAddr>,
) -> Response {
    debug!("http announce request: {:#?}", announce_request);

    // An explicit `ip` param wins; otherwise the peer is reachable where
    // the request came from.
    let peer_ip = announce_request.ip.unwrap_or_else(|| client_addr.ip());

    let mut peer = peer_from_request(&announce_request, &peer_ip);

    let peers_wanted = announce_request.numwant.map(|numwant| numwant as usize);

    let announce_data = match tracker.announce(&announce_request.info_hash, &mut peer, &peer_ip, peers_wanted) {
        Ok(announce_data) => announce_data,
        Err(error) => return responses::error::Error::from(error).into_response(),
    };

    build_response(&announce_request, announce_data)
}

fn build_response(announce_request: &Announce, announce_data: AnnounceData) -> Response {
    if announce_request.compact.as_ref().is_some_and(|form| *form == Compact::Accepted) {
        let response: responses::announce::Compact = announce_data.into();
        response.into_response()
    } else {
        let response: responses::announce::NonCompact = announce_data.into();
        response.into_response()
    }
}

/// It builds a `Peer` from the announce request, stamping it with "now".
///
/// The peer's contact address combines the resolved IP with the port the
/// client says it is listening on.
#[must_use]
fn peer_from_request(announce_request: &Announce, peer_ip: &IpAddr) -> peer::Peer {
    peer::Peer {
        peer_id: announce_request.peer_id,
        peer_addr: SocketAddr::new(*peer_ip, announce_request.port),
        updated: CurrentClock::now(),
        uploaded: NumberOfBytes(announce_request.uploaded.unwrap_or(0)),
        downloaded: NumberOfBytes(announce_request.downloaded.unwrap_or(0)),
        left: NumberOfBytes(announce_request.left.unwrap_or(0)),
        event: map_to_announce_event(announce_request.event.as_ref()),
    }
}

#[must_use]
fn map_to_announce_event(event: Option<&Event>) -> AnnounceEvent {
    match event {
        Some(Event::Started) => AnnounceEvent::Started,
        Some(Event::Stopped) => AnnounceEvent::Stopped,
        Some(Event::Completed) => AnnounceEvent::Completed,
        None => AnnounceEvent::None,
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use depot_tracker_primitives::announce_event::AnnounceEvent;
    use depot_tracker_primitives::info_hash::InfoHash;
    use depot_tracker_primitives::peer;

    use super::peer_from_request;
    use crate::servers::http::v1::requests::announce::{Announce, Event};

    fn sample_announce_request() -> Announce {
        Announce {
            info_hash: "3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0".parse::<InfoHash>().unwrap(),
            peer_id: peer::Id(*b"-qB00000000000000001"),
            port: 17548,
            downloaded: Some(10),
            uploaded: Some(20),
            left: Some(30),
            ip: None,
            event: Some(Event::Started),
            compact: None,
            numwant: None,
            no_peer_id: false,
        }
    }

    #[test]
    fn it_should_build_the_stored_peer_from_the_request_and_the_resolved_ip() {
        let peer_ip = IpAddr::V4(Ipv4Addr::new(126, 0, 0, 1));

        let peer = peer_from_request(&sample_announce_request(), &peer_ip);

        assert_eq!(peer.peer_addr.ip(), peer_ip);
        assert_eq!(peer.peer_addr.port(), 17548);
        assert_eq!(peer.uploaded.0, 20);
        assert_eq!(peer.downloaded.0, 10);
        assert_eq!(peer.left.0, 30);
        assert_eq!(peer.event, AnnounceEvent::Started);
    }

    #[test]
    fn it_should_default_absent_byte_counters_to_zero() {
        let mut request = sample_announce_request();
        request.downloaded = None;
        request.uploaded = None;
        request.left = None;
        request.event = None;

        let peer = peer_from_request(&request, &IpAddr::V4(Ipv4Addr::new(126, 0, 0, 1)));

        assert_eq!(peer.uploaded.0, 0);
        assert_eq!(peer.downloaded.0, 0);
        assert_eq!(peer.left.0, 0);
        assert_eq!(peer.event, AnnounceEvent::None);
    }
}
