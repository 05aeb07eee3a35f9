//! Bruecke zwischen Session-Ereignissen und Prometheus-Metriken

use std::sync::Arc;

use strangerlink_observability::StrangerlinkMetrics;
use strangerlink_signaling::{SessionEreignis, SignalingState};
use tokio::sync::broadcast::error::RecvError;

/// Abonniert die Session-Ereignisse und fuehrt die Metriken nach
///
/// Laeuft bis der Ereignis-Kanal geschlossen wird.
pub async fn verbuchen(state: Arc<SignalingState>, metriken: StrangerlinkMetrics) {
    let mut rx = state.sessions.ereignisse_abonnieren();

    loop {
        match rx.recv().await {
            Ok(ereignis) => ereignis_verbuchen(&metriken, &ereignis),
            Err(RecvError::Lagged(verpasst)) => {
                tracing::warn!(verpasst, "Metriken: Session-Ereignisse uebersprungen");
            }
            Err(RecvError::Closed) => break,
        }

        let statistik = state.sessions.statistik();
        metriken.zustand_setzen(statistik.verbindungen, statistik.wartend, statistik.paare);
    }
}

/// Zaehlt ein einzelnes Ereignis
pub fn ereignis_verbuchen(metriken: &StrangerlinkMetrics, ereignis: &SessionEreignis) {
    match ereignis {
        SessionEreignis::Gepaart { .. } => metriken.matches_total.inc(),
        SessionEreignis::Weitergeleitet { art } => metriken.weitergeleitet(art),
        SessionEreignis::Verworfen { art } => metriken.verworfen(art),
        SessionEreignis::Gemeldet { .. } => metriken.reports_total.inc(),
        SessionEreignis::Gebannt { .. } => metriken.bans_total.inc(),
        SessionEreignis::Abgelehnt { .. } => metriken.rejected_registrations_total.inc(),
        SessionEreignis::VerbindungAngenommen { .. }
        | SessionEreignis::Registriert { .. }
        | SessionEreignis::Wartend { .. }
        | SessionEreignis::SitzungBeendet { .. }
        | SessionEreignis::Getrennt { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strangerlink_core::types::ClientId;

    #[test]
    fn ereignisse_werden_gezaehlt() {
        let metriken = StrangerlinkMetrics::neu().unwrap();

        ereignis_verbuchen(
            &metriken,
            &SessionEreignis::Gepaart {
                a: ClientId::from("a"),
                b: ClientId::from("b"),
            },
        );
        ereignis_verbuchen(&metriken, &SessionEreignis::Weitergeleitet { art: "offer" });
        ereignis_verbuchen(&metriken, &SessionEreignis::Verworfen { art: "ice" });
        ereignis_verbuchen(
            &metriken,
            &SessionEreignis::Gemeldet {
                gemeldet: ClientId::from("b"),
                anzahl: 1,
            },
        );
        ereignis_verbuchen(
            &metriken,
            &SessionEreignis::Gebannt {
                client_id: ClientId::from("b"),
                meldungen: 5,
            },
        );

        assert_eq!(metriken.matches_total.get(), 1);
        assert_eq!(metriken.relayed_total.with_label_values(&["offer"]).get(), 1);
        assert_eq!(metriken.dropped_total.with_label_values(&["ice"]).get(), 1);
        assert_eq!(metriken.reports_total.get(), 1);
        assert_eq!(metriken.bans_total.get(), 1);
        assert_eq!(metriken.rejected_registrations_total.get(), 0);
    }

    #[tokio::test]
    async fn verbuchen_folgt_dem_sitzungszustand() {
        let state = SignalingState::neu(Default::default());
        let metriken = StrangerlinkMetrics::neu().unwrap();
        let task = tokio::spawn(verbuchen(Arc::clone(&state), metriken.clone()));
        tokio::task::yield_now().await;

        let herkunft = "127.0.0.1:5000".parse::<std::net::SocketAddr>().unwrap().into();
        let (_v, _rx) = state.sessions.verbindung_annehmen(herkunft).unwrap();

        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while metriken.connected_clients.get() != 1 {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("Gauge wurde nicht aktualisiert");

        task.abort();
    }
}
