//! # Concurrency Scenarios
//!
//! Racing decisions for one (validator, duty kind) are serialized, so exactly
//! one of a set of conflicting requests wins. Prunes interleave with signing
//! without ever refusing a safe duty or deleting a record above the floor.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    use qs_01_slashing_protection::{FileBackedKVStore, SignedAttestation, SlashingProtection};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use crate::fixtures::{engine_over, id_of, memory_engine, pubkey, root};

    const RACERS: usize = 16;

    #[test]
    fn test_conflicting_blocks_yield_exactly_one_permit() {
        let engine = memory_engine(&[1]);
        let barrier = Barrier::new(RACERS);

        let permits = thread::scope(|scope| {
            let handles: Vec<_> = (0..RACERS)
                .map(|i| {
                    let engine = &engine;
                    let barrier = &barrier;
                    scope.spawn(move || {
                        barrier.wait();
                        engine
                            .may_sign_block(&pubkey(1), 42, &root(i as u8))
                            .unwrap()
                            .is_permitted()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|permitted| *permitted)
                .count()
        });

        assert_eq!(permits, 1);
        let id = id_of(&engine, 1);
        assert_eq!(engine.ledger().begin().find_blocks(id).unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_conflicting_votes_on_worker_pool_yield_one_permit() {
        let engine = Arc::new(memory_engine(&[1]));

        let tasks: Vec<_> = (0..RACERS)
            .map(|i| {
                let engine = Arc::clone(&engine);
                tokio::task::spawn_blocking(move || {
                    engine
                        .may_sign_attestation(&pubkey(1), 3, 4, &root(i as u8))
                        .unwrap()
                        .is_permitted()
                })
            })
            .collect();

        let mut permits = 0;
        for task in tasks {
            if task.await.unwrap() {
                permits += 1;
            }
        }
        assert_eq!(permits, 1);
    }

    #[test]
    fn test_random_votes_never_store_a_surround_or_double_vote() {
        let engine = memory_engine(&[1]);
        let barrier = Barrier::new(4);

        thread::scope(|scope| {
            for worker in 0..4u64 {
                let engine = &engine;
                let barrier = &barrier;
                scope.spawn(move || {
                    let mut rng = StdRng::seed_from_u64(worker);
                    barrier.wait();
                    for _ in 0..200 {
                        let source = rng.gen_range(0..30);
                        let target = source + rng.gen_range(0..10);
                        let signing_root = root(rng.gen());
                        engine
                            .may_sign_attestation(&pubkey(1), source, target, &signing_root)
                            .unwrap();
                    }
                });
            }
        });

        let id = id_of(&engine, 1);
        let stored: Vec<SignedAttestation> =
            engine.ledger().begin().find_attestations(id).unwrap();
        assert!(!stored.is_empty());

        let targets: HashSet<_> = stored.iter().map(|a| a.target_epoch).collect();
        assert_eq!(targets.len(), stored.len(), "two roots share a target epoch");
        for a in &stored {
            for b in &stored {
                assert!(!a.surrounds(b), "{:?} surrounds {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_prune_interleaved_with_signing_never_denies_fresh_duties() {
        let engine = memory_engine(&[1]);
        let id = id_of(&engine, 1);

        let signing_done = AtomicBool::new(false);

        let denied = thread::scope(|scope| {
            let signer = scope.spawn(|| {
                let denied: Vec<u64> = (0..200u64)
                    .filter(|slot| {
                        let decision = engine.may_sign_block(&pubkey(1), *slot, &root(*slot as u8));
                        !matches!(decision, Ok(d) if d.is_permitted())
                    })
                    .collect();
                signing_done.store(true, Ordering::SeqCst);
                denied
            });
            scope.spawn(|| {
                while !signing_done.load(Ordering::SeqCst) {
                    engine.prune_for_validator(id, 5, 1).unwrap();
                }
            });
            signer.join().unwrap()
        });
        assert!(denied.is_empty(), "fresh slots denied: {:?}", denied);

        engine.prune_for_validator(id, 5, 1).unwrap();
        let tx = engine.ledger().begin();
        let slots: Vec<_> = tx.find_blocks(id).unwrap().iter().map(|b| b.slot).collect();
        assert_eq!(slots, vec![195, 196, 197, 198, 199]);
        assert_eq!(tx.get_watermark(id).unwrap().unwrap().slot, Some(195));
    }

    #[test]
    fn test_block_and_attestation_floors_survive_concurrent_prunes() {
        let engine = memory_engine(&[1]);
        let id = id_of(&engine, 1);
        let remaining = AtomicUsize::new(2);

        let (blocks_denied, votes_denied) = thread::scope(|scope| {
            let blocks = scope.spawn(|| {
                let denied: Vec<u64> = (0..100u64)
                    .filter(|slot| {
                        let decision = engine.may_sign_block(&pubkey(1), *slot, &root(1));
                        !matches!(decision, Ok(d) if d.is_permitted())
                    })
                    .collect();
                remaining.fetch_sub(1, Ordering::SeqCst);
                denied
            });
            let votes = scope.spawn(|| {
                let denied: Vec<u64> = (1..101u64)
                    .filter(|target| {
                        let decision =
                            engine.may_sign_attestation(&pubkey(1), target - 1, *target, &root(2));
                        !matches!(decision, Ok(d) if d.is_permitted())
                    })
                    .collect();
                remaining.fetch_sub(1, Ordering::SeqCst);
                denied
            });
            scope.spawn(|| {
                while remaining.load(Ordering::SeqCst) > 0 {
                    if engine.prune_for_validator(id, 3, 1).is_err() {
                        break;
                    }
                }
            });
            (blocks.join().unwrap(), votes.join().unwrap())
        });
        assert!(blocks_denied.is_empty(), "slots denied: {:?}", blocks_denied);
        assert!(votes_denied.is_empty(), "targets denied: {:?}", votes_denied);

        engine.prune_for_validator(id, 3, 1).unwrap();
        let watermark = engine.ledger().begin().get_watermark(id).unwrap().unwrap();
        assert_eq!(watermark.slot, Some(97));
        assert_eq!(watermark.source_epoch, Some(98));
        assert_eq!(watermark.target_epoch, Some(98));
    }

    #[test]
    fn test_validators_sign_in_parallel_over_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileBackedKVStore::open(dir.path().join("ledger.db")).unwrap());
        let keys = [1u8, 2, 3, 4];
        let engine = engine_over(store, &keys);

        thread::scope(|scope| {
            for key in keys {
                let engine = &engine;
                scope.spawn(move || {
                    for slot in 0..25u64 {
                        assert!(engine
                            .may_sign_block(&pubkey(key), slot, &root(key))
                            .unwrap()
                            .is_permitted());
                        assert!(engine
                            .may_sign_attestation(&pubkey(key), slot, slot + 1, &root(key))
                            .unwrap()
                            .is_permitted());
                    }
                });
            }
        });

        let reopened = engine_over(
            Arc::new(FileBackedKVStore::open(dir.path().join("ledger.db")).unwrap()),
            &keys,
        );
        for key in keys {
            let id = id_of(&reopened, key);
            let tx = reopened.ledger().begin();
            assert_eq!(tx.find_blocks(id).unwrap().len(), 25);
            assert_eq!(tx.find_attestations(id).unwrap().len(), 25);
        }
    }
}
