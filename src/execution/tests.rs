/// Race tests for the execution layer
///
/// These drive the coordinator and supervisor end to end over scripted chain clients.

#[cfg(test)]
mod race_tests {
    use super::super::*;
    use crate::errors::GovernorError;
    use crate::logic::graph::AssetKey;
    use crate::logic::types::{Hop, Signal};
    use alloy_primitives::utils::parse_ether;
    use alloy_primitives::{Address, B256};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    const GWEI: u128 = 1_000_000_000;

    fn signal() -> Arc<Signal> {
        let a = AssetKey::new("uni", "WETH");
        let b = AssetKey::new("sushi", "USDC");
        let path = vec![Hop { from: a.clone(), to: b.clone(), rate: 2.1 }, Hop { from: b, to: a, rate: 0.5 }];
        let weight = path.iter().map(|hop| -hop.rate.ln()).sum();
        Arc::new(Signal::profitable(Some(B256::repeat_byte(0x01)), path, weight))
    }

    fn governor(name: &str, chain_id: u64, client: Arc<MockChainClient>) -> eyre::Result<Arc<NetworkGovernor>> {
        let profile = NetworkProfile::new(name, chain_id, parse_ether("0.005")?, GWEI);
        Ok(Arc::new(NetworkGovernor::new(profile, client, Address::repeat_byte(0xee))))
    }

    async fn next_report(rx: &mut tokio::sync::mpsc::UnboundedReceiver<StrikeReport>) -> eyre::Result<StrikeReport> {
        timeout(Duration::from_secs(5), rx.recv()).await?.ok_or_else(|| eyre::eyre!("report channel closed"))
    }

    #[tokio::test]
    async fn test_every_network_reports_once() -> eyre::Result<()> {
        let funded = Arc::new(MockChainClient::new(parse_ether("1")?, GWEI));
        let broke = Arc::new(MockChainClient::new(parse_ether("0.001")?, GWEI));
        let rejecting = Arc::new(MockChainClient::new(parse_ether("1")?, GWEI).failing_submit());

        let (coordinator, mut rx) = ExecutionRaceCoordinator::new(vec![
            governor("ETHEREUM", 1, funded)?,
            governor("BASE", 8453, broke)?,
            governor("ARBITRUM", 42161, rejecting)?,
        ]);
        assert_eq!(coordinator.strike(signal()), 3);

        let mut supervisor = StrikeSupervisor::new(tokio::sync::mpsc::unbounded_channel().1);
        let mut categories = Vec::new();
        for _ in 0..3 {
            let report = next_report(&mut rx).await?;
            assert_eq!(report.trigger, Some(B256::repeat_byte(0x01)));
            categories.push((report.network.clone(), report.outcome.category()));
            supervisor.observe(&report);
        }
        categories.sort();

        assert_eq!(
            categories,
            vec![
                ("ARBITRUM".to_string(), StrikeCategory::Failed),
                ("BASE".to_string(), StrikeCategory::Skipped),
                ("ETHEREUM".to_string(), StrikeCategory::Submitted),
            ]
        );
        assert_eq!(supervisor.stats(), RaceStats { submitted: 1, skipped: 1, failed: 1, faulted: 0 });
        assert!(rx.try_recv().is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_slow_network_does_not_delay_others() -> eyre::Result<()> {
        let slow = Arc::new(MockChainClient::new(parse_ether("1")?, GWEI).with_delay(Duration::from_millis(300)));
        let fast = Arc::new(MockChainClient::new(parse_ether("1")?, GWEI));

        let (coordinator, mut rx) = ExecutionRaceCoordinator::new(vec![
            governor("SLOW", 1, Arc::clone(&slow))?,
            governor("FAST", 8453, Arc::clone(&fast))?,
        ]);
        coordinator.strike(signal());

        let first = next_report(&mut rx).await?;
        assert_eq!(first.network, "FAST");
        assert!(first.elapsed < Duration::from_millis(300));

        let second = next_report(&mut rx).await?;
        assert_eq!(second.network, "SLOW");
        assert_eq!(second.outcome.category(), StrikeCategory::Submitted);

        let (Some(slow_start), Some(fast_start)) = (slow.first_call_at(), fast.first_call_at()) else {
            panic!("both clients should have been called");
        };
        let skew = if slow_start > fast_start { slow_start - fast_start } else { fast_start - slow_start };
        assert!(skew < Duration::from_millis(100));
        Ok(())
    }

    #[tokio::test]
    async fn test_panicking_attempt_is_contained() -> eyre::Result<()> {
        let panicking = Arc::new(MockChainClient::new(parse_ether("1")?, GWEI).panicking_submit());
        let healthy = Arc::new(MockChainClient::new(parse_ether("1")?, GWEI));

        let (coordinator, rx) = ExecutionRaceCoordinator::new(vec![
            governor("FAULTY", 1, panicking)?,
            governor("HEALTHY", 8453, Arc::clone(&healthy))?,
        ]);
        let supervisor = tokio::spawn(StrikeSupervisor::new(rx).run());

        assert_eq!(coordinator.strike(signal()), 2);
        drop(coordinator);

        let stats = timeout(Duration::from_secs(5), supervisor).await??;
        assert_eq!(stats, RaceStats { submitted: 1, skipped: 0, failed: 0, faulted: 1 });
        assert_eq!(healthy.submitted().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_stalled_primary_submit_reports_submitted() -> eyre::Result<()> {
        let primary = Arc::new(MockChainClient::new(parse_ether("1")?, GWEI).with_delay(Duration::from_millis(120)));
        let secondary = Arc::new(MockChainClient::new(parse_ether("1")?, GWEI).failing_submit());
        let client = FallbackClient::new(primary.clone(), secondary.clone())
            .with_stall_timeouts(Duration::from_millis(80), Duration::from_millis(120));
        let profile = NetworkProfile::new("ETHEREUM", 1, parse_ether("0.005")?, GWEI);
        let governor = Arc::new(NetworkGovernor::new(profile, Arc::new(client), Address::repeat_byte(0xee)));

        let (coordinator, mut rx) = ExecutionRaceCoordinator::new(vec![governor]);
        assert_eq!(coordinator.strike(signal()), 1);

        let report = next_report(&mut rx).await?;
        assert_eq!(report.outcome.category(), StrikeCategory::Submitted);
        assert_eq!(primary.submitted().len(), 1);
        assert!(secondary.submitted().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_unprofitable_signal_dispatches_nothing() -> eyre::Result<()> {
        let client = Arc::new(MockChainClient::new(parse_ether("1")?, GWEI));
        let (coordinator, mut rx) = ExecutionRaceCoordinator::new(vec![governor("ETHEREUM", 1, Arc::clone(&client))?]);

        assert_eq!(coordinator.strike(Arc::new(Signal::not_profitable(None))), 0);
        drop(coordinator);

        assert!(rx.recv().await.is_none());
        assert!(client.first_call_at().is_none());
        Ok(())
    }

    #[test]
    fn test_outcome_classification() {
        let skipped = StrikeOutcome::from_attempt(Err(GovernorError::InsufficientFunds {
            balance: Default::default(),
            overhead: Default::default(),
        }));
        assert_eq!(skipped.category(), StrikeCategory::Skipped);
        assert_eq!(StrikeCategory::Faulted.to_string(), "faulted");

        let stats = RaceStats { submitted: 2, skipped: 1, failed: 0, faulted: 1 };
        assert_eq!(stats.count(StrikeCategory::Submitted), 2);
        assert_eq!(stats.total(), 4);
    }
}
