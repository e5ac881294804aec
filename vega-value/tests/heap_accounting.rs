use vega_value::{heap_stats, Array, VString};

#[test]
fn string_and_array_counts_balance_on_drop() {
    let before = heap_stats();
    {
        let s = VString::new("hello");
        let a = Array::new(4);
        let after_alloc = heap_stats();
        assert_eq!(after_alloc.strings_live, before.strings_live + 1);
        assert_eq!(after_alloc.arrays_live, before.arrays_live + 1);
        drop(s);
        drop(a);
    }
    let after = heap_stats();
    assert_eq!(after.strings_live, before.strings_live);
    assert_eq!(after.arrays_live, before.arrays_live);
}
