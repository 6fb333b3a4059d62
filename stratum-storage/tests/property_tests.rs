//! Property-Based Tests for the Orchestrator
//!
//! - Read triggers refresh: a record held only by a slower tier is present,
//!   identical, in every faster tier once a read returns it
//! - Save is all-or-nothing: whichever tier fails, no tier keeps the record
//! - Update never allocates a new id, whether or not it succeeds
//! - Delete of an absent id always succeeds
//! - Reading an absent id is `Ok(None)`, never an error

use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use stratum_core::RecordId;
use stratum_storage::StorageProvider;
use stratum_test_utils::fixtures::mock_stack;
use stratum_test_utils::generators::{arb_record, arb_record_id, arb_value};
use stratum_test_utils::Operation;

fn runtime() -> Result<tokio::runtime::Runtime, TestCaseError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(fail)
}

fn fail(err: impl std::fmt::Display) -> TestCaseError {
    TestCaseError::fail(err.to_string())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_read_refreshes_faster_tiers(record in arb_record(), holder in 1usize..3) {
        runtime()?.block_on(async {
            let stack = mock_stack().map_err(fail)?;
            match holder {
                1 => stack.file.inner().save(&record).await.map_err(fail)?,
                _ => stack.database.inner().save(&record).await.map_err(fail)?,
            }

            let found = stack.orchestrator.get_by_id(record.id.as_str()).await.map_err(fail)?;
            prop_assert_eq!(found.as_ref(), Some(&record));

            let copies = stack.copies(&record.id).await.map_err(fail)?;
            for copy in &copies[..holder] {
                prop_assert_eq!(copy.as_ref(), Some(&record));
            }
            Ok::<(), TestCaseError>(())
        })?;
    }

    #[test]
    fn prop_save_is_all_or_nothing(value in arb_value(), failing in 0usize..4) {
        runtime()?.block_on(async {
            let stack = mock_stack().map_err(fail)?;
            match failing {
                0 => stack.cache.fail(Operation::Save),
                1 => stack.file.fail(Operation::Save),
                2 => stack.database.fail(Operation::Save),
                _ => {}
            }

            let counts = || {
                [
                    stack.cache.inner().len(),
                    stack.file.inner().len(),
                    stack.database.inner().len(),
                ]
            };

            match stack.orchestrator.save(&value).await {
                Ok(id) => {
                    prop_assert_eq!(failing, 3);
                    let copies = stack.copies(&id).await.map_err(fail)?;
                    prop_assert!(copies.iter().all(|c| c.as_ref().map(|r| r.value.as_str()) == Some(value.as_str())));
                }
                Err(_) => {
                    prop_assert!(failing < 3);
                    prop_assert_eq!(counts(), [0, 0, 0]);
                }
            }
            Ok::<(), TestCaseError>(())
        })?;
    }

    #[test]
    fn prop_update_never_allocates_new_id(
        initial in arb_value(),
        replacement in arb_value(),
        failing in 0usize..4,
    ) {
        runtime()?.block_on(async {
            let stack = mock_stack().map_err(fail)?;
            let id = stack.orchestrator.save(&initial).await.map_err(fail)?;
            match failing {
                0 => stack.cache.fail(Operation::Update),
                1 => stack.file.fail(Operation::Update),
                2 => stack.database.fail(Operation::Update),
                _ => {}
            }

            let result = stack.orchestrator.update(id.as_str(), &replacement).await;
            if let Ok(updated) = &result {
                prop_assert_eq!(updated, &id);
            }
            prop_assert_eq!(result.is_ok(), failing == 3);

            // Exactly the original record exists, in every tier.
            prop_assert_eq!(stack.cache.inner().len(), 1);
            prop_assert_eq!(stack.file.inner().len(), 1);
            prop_assert_eq!(stack.database.inner().len(), 1);
            prop_assert!(stack.database.inner().contains(&id));
            Ok::<(), TestCaseError>(())
        })?;
    }

    #[test]
    fn prop_absent_id_reads_none_and_deletes_cleanly(id in arb_record_id()) {
        runtime()?.block_on(async {
            let stack = mock_stack().map_err(fail)?;

            let found = stack.orchestrator.get_by_id(id.as_str()).await.map_err(fail)?;
            prop_assert!(found.is_none());

            let report = stack.orchestrator.delete(id.as_str()).await.map_err(fail)?;
            prop_assert!(report.is_complete());
            Ok::<(), TestCaseError>(())
        })?;
    }

    #[test]
    fn prop_saved_ids_are_parseable(value in arb_value()) {
        runtime()?.block_on(async {
            let stack = mock_stack().map_err(fail)?;
            let id = stack.orchestrator.save(&value).await.map_err(fail)?;
            prop_assert_eq!(RecordId::parse(id.as_str()).map_err(fail)?, id);
            Ok::<(), TestCaseError>(())
        })?;
    }
}
