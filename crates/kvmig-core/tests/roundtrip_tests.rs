use kvmig_core::prelude::*;
use kvmig_core::ReconstructReport;
use kvmig_test_utils::{
    arb_cluster_information_resource, arb_felix_resource, converter, parallel_converter,
};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

fn reconstructs_to(report: &ReconstructReport, res: &Resource) -> Result<(), TestCaseError> {
    prop_assert!(report.is_success());
    let found = report.resource(res.kind(), res.name());
    if res.is_empty() {
        prop_assert!(found.is_none());
    } else {
        prop_assert_eq!(found, Some(res));
    }
    Ok(())
}

proptest! {
    #[test]
    fn prop_node_resource_round_trips(res in arb_felix_resource("node.prop")) {
        let conv = converter();
        let entries = conv.decompose(&res).unwrap();
        prop_assert_eq!(entries.len(), res.len());
        reconstructs_to(&conv.reconstruct_many(entries), &res)?;
    }

    #[test]
    fn prop_global_resource_round_trips(res in arb_felix_resource("default")) {
        let conv = converter();
        let entries = conv.decompose(&res).unwrap();
        prop_assert_eq!(entries.len(), res.len());
        reconstructs_to(&conv.reconstruct_many(entries), &res)?;
    }

    #[test]
    fn prop_cluster_information_round_trips(res in arb_cluster_information_resource()) {
        let conv = converter();
        let entries = conv.decompose(&res).unwrap();
        prop_assert_eq!(entries.len(), res.len());
        reconstructs_to(&conv.reconstruct_many(entries), &res)?;
    }

    #[test]
    fn prop_mixed_batch_round_trips(
        global in arb_felix_resource("default"),
        node in arb_felix_resource("node.n1"),
        cluster in arb_cluster_information_resource(),
    ) {
        let conv = converter();
        let batch = [global, node, cluster];
        let decomposed = conv.decompose_many(&batch);
        prop_assert!(decomposed.is_success());

        let report = conv.reconstruct_many(decomposed.entries);
        for res in &batch {
            reconstructs_to(&report, res)?;
        }
    }

    #[test]
    fn prop_batches_are_order_independent_of_parallelism(
        global in arb_felix_resource("default"),
        node in arb_felix_resource("node.n1"),
    ) {
        let batch = [global, node];
        let seq = converter().decompose_many(&batch);
        let par = parallel_converter().decompose_many(&batch);
        prop_assert_eq!(&seq.entries, &par.entries);

        let seq = converter().reconstruct_many(seq.entries);
        let par = parallel_converter().reconstruct_many(par.entries);
        prop_assert_eq!(seq.resources, par.resources);
    }
}
