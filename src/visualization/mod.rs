mod tables;

pub use tables::{
    format_entry_list, format_subtype_table, format_summary_table, format_written_summary,
    print_entry_list, print_subtype_table, print_summary_table,
};
