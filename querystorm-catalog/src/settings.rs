use std::sync::OnceLock;
use std::thread;

/// One tunable engine setting with its candidate values.
#[derive(Clone, Debug)]
pub struct TestSetting {
    pub name: &'static str,
    pub values: Vec<String>,
}

impl TestSetting {
    fn toggle(name: &'static str) -> TestSetting {
        TestSetting {
            name,
            values: vec!["0".to_string(), "1".to_string()],
        }
    }

    fn with(name: &'static str, values: &[&str]) -> TestSetting {
        TestSetting {
            name,
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }
}

/// Session-level server settings used both for random `SET` statements and
/// as the candidate pool of the settings-invariance oracle.
pub fn server_settings() -> &'static [TestSetting] {
    static SETTINGS: OnceLock<Vec<TestSetting>> = OnceLock::new();
    SETTINGS.get_or_init(|| {
        let hardware_threads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .to_string();
        vec![
            TestSetting::toggle("aggregate_functions_null_for_empty"),
            TestSetting::toggle("aggregation_in_order_max_block_bytes"),
            TestSetting::toggle("allow_aggregate_partitions_independently"),
            TestSetting::toggle("allow_introspection_functions"),
            TestSetting::toggle("allow_reorder_prewhere_conditions"),
            TestSetting::toggle("any_join_distinct_right_table_keys"),
            TestSetting::toggle("async_insert"),
            TestSetting::toggle("check_query_single_value_result"),
            TestSetting::toggle("compile_aggregate_expressions"),
            TestSetting::toggle("compile_expressions"),
            TestSetting::toggle("compile_sort_description"),
            TestSetting::toggle("cross_join_min_bytes_to_compress"),
            TestSetting::toggle("cross_join_min_rows_to_compress"),
            TestSetting::toggle("describe_include_subcolumns"),
            TestSetting::toggle("distributed_aggregation_memory_efficient"),
            TestSetting::toggle("enable_analyzer"),
            TestSetting::toggle("enable_memory_bound_merging_of_aggregation_results"),
            TestSetting::toggle("enable_multiple_prewhere_read_steps"),
            TestSetting::toggle("enable_named_columns_in_function_tuple"),
            TestSetting::toggle("enable_optimize_predicate_expression"),
            TestSetting::toggle("enable_optimize_predicate_expression_to_final_subquery"),
            TestSetting::toggle("enable_parsing_to_custom_serialization"),
            TestSetting::toggle("enable_reads_from_query_cache"),
            TestSetting::toggle("enable_scalar_subquery_optimization"),
            TestSetting::toggle("enable_sharing_sets_for_mutations"),
            TestSetting::toggle("enable_software_prefetch_in_aggregation"),
            TestSetting::toggle("enable_unaligned_array_join"),
            TestSetting::toggle("enable_vertical_final"),
            TestSetting::toggle("enable_writes_to_query_cache"),
            TestSetting::toggle("exact_rows_before_limit"),
            TestSetting::toggle("flatten_nested"),
            TestSetting::toggle("force_aggregate_partitions_independently"),
            TestSetting::toggle("fsync_metadata"),
            TestSetting::toggle("group_by_two_level_threshold"),
            TestSetting::toggle("group_by_two_level_threshold_bytes"),
            TestSetting::toggle("http_wait_end_of_query"),
            TestSetting::toggle("input_format_import_nested_json"),
            TestSetting::toggle("input_format_parallel_parsing"),
            TestSetting::toggle("insert_null_as_default"),
            TestSetting::with(
                "join_algorithm",
                &[
                    "'default'",
                    "'grace_hash'",
                    "'direct, hash'",
                    "'hash'",
                    "'parallel_hash'",
                    "'partial_merge'",
                    "'direct'",
                    "'auto'",
                    "'full_sorting_merge'",
                    "'prefer_partial_merge'",
                ],
            ),
            TestSetting::toggle("join_any_take_last_row"),
            TestSetting::toggle("join_use_nulls"),
            TestSetting::with(
                "local_filesystem_read_method",
                &["'read'", "'pread'", "'mmap'", "'pread_threadpool'", "'io_uring'"],
            ),
            TestSetting::toggle("local_filesystem_read_prefetch"),
            TestSetting::toggle("log_queries"),
            TestSetting::toggle("log_query_threads"),
            TestSetting::toggle("low_cardinality_use_single_dictionary_for_part"),
            TestSetting::with("max_bytes_before_external_group_by", &["0", "100000000"]),
            TestSetting::with("max_bytes_before_external_sort", &["0", "100000000"]),
            TestSetting::toggle("max_bytes_before_remerge_sort"),
            TestSetting::toggle("max_final_threads"),
            TestSetting::with("max_threads", &["1", &hardware_threads]),
            TestSetting::toggle("min_chunk_bytes_for_parallel_parsing"),
            TestSetting::with("min_external_table_block_size_bytes", &["0", "100000000"]),
            TestSetting::toggle("move_all_conditions_to_prewhere"),
            TestSetting::toggle("move_primary_key_columns_to_end_of_prewhere"),
            TestSetting::toggle("optimize_aggregation_in_order"),
            TestSetting::toggle("optimize_aggregators_of_group_by_keys"),
            TestSetting::toggle("optimize_append_index"),
            TestSetting::toggle("optimize_arithmetic_operations_in_aggregate_functions"),
            TestSetting::toggle("optimize_count_from_files"),
            TestSetting::toggle("optimize_distinct_in_order"),
            TestSetting::toggle("optimize_group_by_constant_keys"),
            TestSetting::toggle("optimize_group_by_function_keys"),
            TestSetting::toggle("optimize_functions_to_subcolumns"),
            TestSetting::toggle("optimize_if_chain_to_multiif"),
            TestSetting::toggle("optimize_if_transform_strings_to_enum"),
            TestSetting::toggle("optimize_injective_functions_in_group_by"),
            TestSetting::toggle("optimize_injective_functions_inside_uniq"),
            TestSetting::toggle("optimize_move_to_prewhere"),
            TestSetting::toggle("optimize_move_to_prewhere_if_final"),
            TestSetting::toggle("optimize_multiif_to_if"),
            TestSetting::toggle("optimize_normalize_count_variants"),
            TestSetting::toggle("optimize_on_insert"),
            TestSetting::toggle("optimize_or_like_chain"),
            TestSetting::toggle("optimize_read_in_order"),
            TestSetting::toggle("optimize_redundant_functions_in_order_by"),
            TestSetting::toggle("optimize_rewrite_aggregate_function_with_if"),
            TestSetting::toggle("optimize_rewrite_array_exists_to_has"),
            TestSetting::toggle("optimize_rewrite_sum_if_to_count_if"),
            TestSetting::toggle("optimize_skip_merged_partitions"),
            TestSetting::toggle("optimize_skip_unused_shards"),
            TestSetting::toggle("optimize_sorting_by_input_stream_properties"),
            TestSetting::toggle("optimize_substitute_columns"),
            TestSetting::toggle("optimize_syntax_fuse_functions"),
            TestSetting::toggle("optimize_time_filter_with_preimage"),
            TestSetting::toggle("optimize_trivial_approximate_count_query"),
            TestSetting::toggle("optimize_trivial_count_query"),
            TestSetting::toggle("optimize_trivial_insert_select"),
            TestSetting::toggle("optimize_uniq_to_count"),
            TestSetting::toggle("optimize_use_implicit_projections"),
            TestSetting::toggle("optimize_use_projections"),
            TestSetting::toggle("optimize_using_constraints"),
            TestSetting::toggle("output_format_parallel_formatting"),
            TestSetting::toggle("output_format_pretty_row_numbers"),
            TestSetting::toggle("output_format_write_statistics"),
            TestSetting::toggle("page_cache_inject_eviction"),
            TestSetting::toggle("parallel_replicas_allow_in_with_subquery"),
            TestSetting::toggle("parallel_replicas_for_non_replicated_merge_tree"),
            TestSetting::toggle("parallel_replicas_local_plan"),
            TestSetting::toggle("parallel_replicas_prefer_local_join"),
            TestSetting::toggle("parallel_view_processing"),
            TestSetting::toggle("parallelize_output_from_storages"),
            TestSetting::toggle("partial_merge_join_optimizations"),
            TestSetting::toggle("precise_float_parsing"),
            TestSetting::toggle("prefer_external_sort_block_bytes"),
            TestSetting::toggle("prefer_localhost_replica"),
            TestSetting::toggle("query_plan_aggregation_in_order"),
            TestSetting::toggle("query_plan_convert_outer_join_to_inner_join"),
            TestSetting::toggle("query_plan_enable_multithreading_after_window_functions"),
            TestSetting::toggle("query_plan_enable_optimizations"),
            TestSetting::toggle("query_plan_execute_functions_after_sorting"),
            TestSetting::toggle("query_plan_filter_push_down"),
            TestSetting::toggle("query_plan_lift_up_array_join"),
            TestSetting::toggle("query_plan_lift_up_union"),
            TestSetting::toggle("query_plan_max_optimizations_to_apply"),
            TestSetting::toggle("query_plan_merge_expressions"),
            TestSetting::toggle("query_plan_merge_filters"),
            TestSetting::toggle("query_plan_optimize_prewhere"),
            TestSetting::toggle("query_plan_push_down_limit"),
            TestSetting::toggle("query_plan_read_in_order"),
            TestSetting::toggle("query_plan_remove_redundant_distinct"),
            TestSetting::toggle("query_plan_remove_redundant_sorting"),
            TestSetting::toggle("query_plan_reuse_storage_ordering_for_window_functions"),
            TestSetting::toggle("query_plan_split_filter"),
            TestSetting::toggle("read_from_filesystem_cache_if_exists_otherwise_bypass_cache"),
            TestSetting::toggle("read_in_order_use_buffering"),
            TestSetting::toggle("remote_filesystem_read_prefetch"),
            TestSetting::toggle("rows_before_aggregation"),
            TestSetting::toggle("throw_on_error_from_cache_on_write_operations"),
            TestSetting::toggle("transform_null_in"),
            TestSetting::toggle("use_cache_for_count_from_files"),
            TestSetting::toggle("use_concurrency_control"),
            TestSetting::toggle("use_index_for_in_with_subqueries"),
            TestSetting::toggle("use_local_cache_for_remote_storage"),
            TestSetting::toggle("use_page_cache_for_disks_without_file_cache"),
            TestSetting::with(
                "use_query_cache",
                &[
                    "0, set_overflow_mode = 'break', group_by_overflow_mode = 'break', join_overflow_mode = 'break'",
                    "1, set_overflow_mode = 'throw', group_by_overflow_mode = 'throw', join_overflow_mode = 'throw'",
                ],
            ),
            TestSetting::toggle("use_skip_indexes"),
            TestSetting::toggle("use_skip_indexes_if_final"),
            TestSetting::toggle("use_uncompressed_cache"),
            TestSetting::toggle("use_variant_as_common_type"),
        ]
    })
}

/// Table-level settings for MergeTree-family engines, attached to CREATE
/// TABLE and ALTER ... MODIFY SETTING.
pub fn merge_tree_table_settings() -> &'static [TestSetting] {
    static SETTINGS: OnceLock<Vec<TestSetting>> = OnceLock::new();
    SETTINGS.get_or_init(|| {
        vec![
            TestSetting::toggle("allow_experimental_block_number_column"),
            TestSetting::toggle("allow_remote_fs_zero_copy_replication"),
            TestSetting::toggle("allow_suspicious_indices"),
            TestSetting::toggle("allow_vertical_merges_from_compact_to_wide_parts"),
            TestSetting::toggle("always_fetch_merged_part"),
            TestSetting::toggle("assign_part_uuids"),
            TestSetting::toggle("cache_populated_by_fetch"),
            TestSetting::toggle("compress_primary_key"),
            TestSetting::with(
                "deduplicate_merge_projection_mode",
                &["'throw'", "'drop'", "'rebuild'"],
            ),
            TestSetting::toggle("enable_mixed_granularity_parts"),
            TestSetting::with("index_granularity", &["128", "1024", "8192", "32768"]),
            TestSetting::with("index_granularity_bytes", &["0", "10485760"]),
            TestSetting::with("merge_max_block_size", &["64", "8192"]),
            TestSetting::with("min_bytes_for_wide_part", &["0", "10485760", "1073741824"]),
            TestSetting::with("min_rows_for_wide_part", &["0", "1000000"]),
            TestSetting::toggle("old_parts_lifetime"),
            TestSetting::with("ratio_of_defaults_for_sparse_serialization", &["0.0", "0.5", "1.0"]),
            TestSetting::toggle("remove_empty_parts"),
            TestSetting::toggle("replace_long_file_name_to_hash"),
            TestSetting::toggle("ttl_only_drop_parts"),
            TestSetting::toggle("use_compact_variant_discriminators_serialization"),
            TestSetting::with("vertical_merge_algorithm_min_rows_to_activate", &["1", "131072"]),
        ]
    })
}

/// Column-level settings accepted by MergeTree columns.
pub fn merge_tree_column_settings() -> &'static [TestSetting] {
    static SETTINGS: OnceLock<Vec<TestSetting>> = OnceLock::new();
    SETTINGS.get_or_init(|| {
        vec![
            TestSetting::with("max_compress_block_size", &["32768", "1048576"]),
            TestSetting::with("min_compress_block_size", &["1024", "65536"]),
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_required_entries() {
        let settings = server_settings();
        assert!(settings.iter().any(|s| s.name == "optimize_read_in_order"));
        let join = settings
            .iter()
            .find(|s| s.name == "join_algorithm")
            .unwrap();
        assert!(join.values.iter().any(|v| v == "'grace_hash'"));
        let threads = settings.iter().find(|s| s.name == "max_threads").unwrap();
        assert_eq!(threads.values[0], "1");
    }

    #[test]
    fn test_all_entries_have_candidates() {
        for s in server_settings()
            .iter()
            .chain(merge_tree_table_settings())
            .chain(merge_tree_column_settings())
        {
            assert!(s.values.len() >= 2, "{} needs at least two candidates", s.name);
        }
    }
}
