//! FFI Module Tests

use std::ffi::{c_char, CStr};

use super::*;

#[test]
fn test_ffi_type_parsing() {
    assert_eq!(FfiType::from_name("u64"), Some(FfiType::U64));
    assert_eq!(FfiType::from_name("int"), Some(FfiType::I32));
    assert_eq!(FfiType::from_name("LLVMBool"), Some(FfiType::I32));
    assert_eq!(FfiType::from_name("double"), Some(FfiType::F64));
    assert_eq!(FfiType::from_name("void*"), Some(FfiType::Ptr));
    assert_eq!(FfiType::from_name("const char*"), Some(FfiType::CStr));
    assert_eq!(FfiType::from_name("const  char **"), Some(FfiType::OutPtr));
    assert_eq!(FfiType::from_name("invalid"), None);
}

#[test]
fn test_ffi_type_properties() {
    assert!(FfiType::U64.is_integer());
    assert!(!FfiType::U64.is_pointer());
    assert!(!FfiType::F64.is_integer());

    assert!(FfiType::Ptr.is_pointer());
    assert!(FfiType::CStr.is_pointer());
    assert!(FfiType::PtrArray.is_pointer());
    assert!(FfiType::OutBool.is_out());

    assert_eq!(FfiType::Bool.abi_class(), AbiClass::Int(1));
    assert_eq!(FfiType::I32.abi_class(), FfiType::U32.abi_class());
    assert_ne!(FfiType::I32.abi_class(), FfiType::I64.abi_class());
    assert_eq!(FfiType::CStr.abi_class(), AbiClass::Pointer);
    assert_eq!(FfiType::F64.abi_class(), AbiClass::Float);
}

#[test]
fn test_signature_parsing() {
    // Simple function
    let sig = FfiSignature::parse("int add(int a, int b)").unwrap();
    assert_eq!(sig.name, "add");
    assert_eq!(sig.return_type, FfiType::I32);
    assert_eq!(sig.params, vec![FfiType::I32, FfiType::I32]);

    // Void return
    let sig = FfiSignature::parse("void LLVMPY_SetModuleName(ptr m, cstr name)").unwrap();
    assert_eq!(sig.name, "LLVMPY_SetModuleName");
    assert_eq!(sig.return_type, FfiType::Void);
    assert_eq!(sig.params, vec![FfiType::Ptr, FfiType::CStr]);

    // No parameters
    let sig = FfiSignature::parse("u32 LLVMPY_GetVersionInfo(void)").unwrap();
    assert_eq!(sig.return_type, FfiType::U32);
    assert!(sig.params.is_empty());

    assert!(FfiSignature::parse("nonsense").is_none());
    assert!(FfiSignature::parse("widget f(int)").is_none());
}

#[test]
fn test_signature_display() {
    let sig = FfiSignature::new("add", vec![FfiType::I32, FfiType::I32], FfiType::I32);
    assert_eq!(sig.to_string(), "i32 add(i32, i32)");

    let sig = FfiSignature::new(
        "LLVMPY_ParseAssembly",
        vec![FfiType::Ptr, FfiType::CStr, FfiType::OutPtr],
        FfiType::Ptr,
    );
    assert_eq!(sig.to_string(), "ptr LLVMPY_ParseAssembly(ptr, cstr, char**)");
}

#[test]
fn test_signature_validation() {
    let sig = FfiSignature::new("add", vec![FfiType::I32, FfiType::I32], FfiType::I32);
    assert!(sig.validate_args(2));
    assert!(!sig.validate_args(1));
    assert!(!sig.validate_args(3));
    assert_eq!(sig.out_count(), 0);
    assert!(sig.check_callable().is_ok());

    let too_many = FfiSignature::new("wide", vec![FfiType::U64; MAX_ARITY + 1], FfiType::Void);
    assert!(matches!(
        too_many.check_callable(),
        Err(FfiError::InvalidSignature { .. })
    ));

    let out_return = FfiSignature::new("bad", vec![], FfiType::OutPtr);
    assert!(out_return.check_callable().is_err());

    let float_param = FfiSignature::new("bad", vec![FfiType::F64], FfiType::Void);
    assert!(float_param.check_callable().is_err());
}

#[test]
fn test_signature_compatibility() {
    let a = FfiSignature::new("f", vec![FfiType::Ptr, FfiType::I32], FfiType::Bool);
    let b = FfiSignature::new("f", vec![FfiType::Ptr, FfiType::U32], FfiType::Bool);
    let c = FfiSignature::new("f", vec![FfiType::Ptr, FfiType::I64], FfiType::Bool);
    let d = FfiSignature::new("f", vec![FfiType::Ptr], FfiType::Bool);
    assert!(a.is_compatible_with(&b));
    assert!(!a.is_compatible_with(&c));
    assert!(!a.is_compatible_with(&d));
}

#[test]
fn test_ffi_error_display() {
    let err = FfiError::UnknownSymbol {
        symbol: "LLVMPY_Nope".to_string(),
        detail: "not exported".to_string(),
    };
    assert!(err.to_string().contains("LLVMPY_Nope"));

    let err = FfiError::marshal("add", 1, "value 4294967296 out of range for i32");
    assert!(err.to_string().contains("argument 1"));
    assert!(err.to_string().contains("'add'"));

    let err = FfiError::LibraryNotFound {
        name: "llvmbind".to_string(),
        searched: vec![],
    };
    assert!(err.to_string().contains("<none>"));
}

// Native stand-ins for marshaling tests

extern "C" fn add_i32(a: i32, b: i32) -> i32 {
    a.wrapping_add(b)
}

extern "C" fn wide_garbage() -> u64 {
    0xDEAD_BEEF_FFFF_FFFF
}

extern "C" fn bool_high_bits() -> u64 {
    0x100
}

extern "C" fn text_len(s: *const c_char) -> usize {
    if s.is_null() {
        return usize::MAX;
    }
    unsafe { CStr::from_ptr(s) }.to_bytes().len()
}

extern "C" fn greeting() -> *const c_char {
    b"hello\0".as_ptr() as *const c_char
}

extern "C" fn latin1_name() -> *const c_char {
    b"f\xffx\0".as_ptr() as *const c_char
}

extern "C" fn write_message(out: *mut *const c_char, flag: *mut bool) -> i32 {
    unsafe {
        *out = b"out-slot\0".as_ptr() as *const c_char;
        *flag = true;
    }
    7
}

extern "C" fn sum_array(items: *const usize, count: u32) -> u64 {
    let items = unsafe { std::slice::from_raw_parts(items, count as usize) };
    items.iter().map(|&i| i as u64).sum()
}

extern "C" fn half(v: i64) -> f64 {
    v as f64 / 2.0
}

extern "C" fn six(a: u64, b: u64, c: u64, d: u64, e: u64, f: u64) -> u64 {
    a + b * 10 + c * 100 + d * 1000 + e * 10_000 + f * 100_000
}

fn test_library() -> NativeLibrary {
    NativeLibrary::from_source(
        SymbolTable::new("ffi-tests")
            .with("add_i32", add_i32 as usize)
            .with("wide_garbage", wide_garbage as usize)
            .with("bool_high_bits", bool_high_bits as usize)
            .with("text_len", text_len as usize)
            .with("greeting", greeting as usize)
            .with("latin1_name", latin1_name as usize)
            .with("write_message", write_message as usize)
            .with("sum_array", sum_array as usize)
            .with("half", half as usize)
            .with("six", six as usize),
    )
}

fn call(registry: &SignatureRegistry, name: &str, args: &[FfiValue]) -> Result<CallOutcome> {
    let library = test_library();
    let symbol = registry.resolve(&library, name)?;
    unsafe { invoke(&symbol, args) }
}

fn registry_with(sig: &str) -> SignatureRegistry {
    let registry = SignatureRegistry::new();
    registry
        .declare_signature(FfiSignature::parse(sig).unwrap())
        .unwrap();
    registry
}

#[test]
fn test_invoke_signed_integers() {
    let registry = registry_with("i32 add_i32(i32, i32)");
    let out = call(&registry, "add_i32", &[FfiValue::Int(-5), FfiValue::Int(3)]).unwrap();
    assert_eq!(out.ret, FfiValue::Int(-2));
    assert!(out.outs.is_empty());
}

#[test]
fn test_narrow_returns_are_masked() {
    let registry = registry_with("i32 wide_garbage()");
    registry.declare("bool_high_bits", vec![], FfiType::Bool).unwrap();
    assert_eq!(
        call(&registry, "wide_garbage", &[]).unwrap().ret,
        FfiValue::Int(-1)
    );
    assert_eq!(
        call(&registry, "bool_high_bits", &[]).unwrap().ret,
        FfiValue::Bool(false)
    );

    registry.declare("wide_garbage", vec![], FfiType::U32).unwrap();
    assert_eq!(
        call(&registry, "wide_garbage", &[]).unwrap().ret,
        FfiValue::UInt(0xFFFF_FFFF)
    );
}

#[test]
fn test_out_of_range_argument_is_rejected() {
    let registry = registry_with("i32 add_i32(i32, i32)");
    let err = call(&registry, "add_i32", &[FfiValue::Int(1), FfiValue::Int(1 << 40)]).unwrap_err();
    match err {
        FfiError::Marshal { symbol, index, .. } => {
            assert_eq!(symbol, "add_i32");
            assert_eq!(index, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_wrong_value_kind_and_arity() {
    let registry = registry_with("i32 add_i32(i32, i32)");
    let err = call(&registry, "add_i32", &[FfiValue::Int(1), "two".into()]).unwrap_err();
    assert!(matches!(err, FfiError::Marshal { index: 1, .. }));

    let err = call(&registry, "add_i32", &[FfiValue::Int(1)]).unwrap_err();
    assert!(matches!(err, FfiError::Marshal { .. }));
}

#[test]
fn test_text_arguments() {
    let registry = registry_with("usize text_len(cstr)");
    let out = call(&registry, "text_len", &["module.ll".into()]).unwrap();
    assert_eq!(out.ret, FfiValue::UInt(9));

    let out = call(&registry, "text_len", &[FfiValue::Null]).unwrap();
    assert_eq!(out.ret.as_u64(), Some(usize::MAX as u64));

    let err = call(&registry, "text_len", &["bad\0text".into()]).unwrap_err();
    assert!(err.to_string().contains("NUL byte at offset 3"));
}

#[test]
fn test_cstr_return_is_copied() {
    let registry = registry_with("cstr greeting()");
    let out = call(&registry, "greeting", &[]).unwrap();
    assert_eq!(out.ret.into_text().as_deref(), Some("hello"));
}

#[test]
fn test_non_utf8_cstr_return_keeps_bytes() {
    let registry = registry_with("cstr latin1_name()");
    let out = call(&registry, "latin1_name", &[]).unwrap();
    assert_eq!(out.ret, FfiValue::Bytes(vec![b'f', 0xFF, b'x']));
    assert_eq!(out.ret.clone().into_text(), None);

    // The same bytes go back out unchanged
    let registry = registry_with("usize text_len(cstr)");
    let bytes = out.ret.as_bytes().unwrap();
    let len = call(&registry, "text_len", &[bytes.into()]).unwrap();
    assert_eq!(len.ret, FfiValue::UInt(3));

    let err = call(&registry, "text_len", &[FfiValue::Bytes(vec![1, 0, 2])]).unwrap_err();
    assert!(err.to_string().contains("NUL byte at offset 1"));
}

#[test]
fn test_out_slots() {
    let registry = registry_with("i32 write_message(char**, bool*)");
    let out = call(&registry, "write_message", &[FfiValue::Out, FfiValue::Out]).unwrap();
    assert_eq!(out.ret, FfiValue::Int(7));
    assert_eq!(out.outs.len(), 2);
    assert_eq!(out.out(1), &FfiValue::Bool(true));

    let addr = out.out(0).as_ptr().unwrap();
    let text = unsafe { CStr::from_ptr(addr as *const c_char) };
    assert_eq!(text.to_str().unwrap(), "out-slot");

    // Out-slots need a placeholder, not a value
    let err = call(&registry, "write_message", &[FfiValue::Null, FfiValue::Out]).unwrap_err();
    assert!(matches!(err, FfiError::Marshal { index: 0, .. }));
}

#[test]
fn test_pointer_array_argument() {
    let registry = registry_with("u64 sum_array(ptr[], u32)");
    let out = call(
        &registry,
        "sum_array",
        &[FfiValue::PtrArray(vec![1, 2, 3, 40]), FfiValue::UInt(4)],
    )
    .unwrap();
    assert_eq!(out.ret, FfiValue::UInt(46));
}

#[test]
fn test_double_return() {
    let registry = registry_with("f64 half(i64)");
    let out = call(&registry, "half", &[FfiValue::Int(-7)]).unwrap();
    assert_eq!(out.ret, FfiValue::Float(-3.5));
}

#[test]
fn test_max_arity() {
    let registry = SignatureRegistry::new();
    registry.declare("six", vec![FfiType::U64; 6], FfiType::U64).unwrap();
    let args: Vec<FfiValue> = (1..=6).map(FfiValue::UInt).collect();
    let out = call(&registry, "six", &args).unwrap();
    assert_eq!(out.ret, FfiValue::UInt(654_321));
}

#[test]
fn test_registry_resolution_rules() {
    let library = test_library();
    let registry = SignatureRegistry::new();

    // Never declared
    assert!(matches!(
        registry.resolve(&library, "add_i32"),
        Err(FfiError::UnknownSymbol { .. })
    ));

    // Declared but not exported
    registry.declare("missing", vec![], FfiType::Void).unwrap();
    assert!(matches!(
        registry.resolve(&library, "missing"),
        Err(FfiError::UnknownSymbol { .. })
    ));

    registry
        .declare("add_i32", vec![FfiType::I32, FfiType::I32], FfiType::I32)
        .unwrap();
    let first = registry.resolve(&library, "add_i32").unwrap();
    let again = registry.resolve(&library, "add_i32").unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &again));
    assert_eq!(registry.bound_count(), 1);

    // Same ABI classes rebind in place
    registry
        .declare("add_i32", vec![FfiType::U32, FfiType::U32], FfiType::I32)
        .unwrap();
    let rebound = registry.resolve(&library, "add_i32").unwrap();
    assert_eq!(rebound.address(), first.address());
    assert_eq!(rebound.signature().params[0], FfiType::U32);

    // Different arity conflicts with the bound symbol
    registry
        .declare("add_i32", vec![FfiType::I32], FfiType::I32)
        .unwrap();
    assert!(matches!(
        registry.resolve(&library, "add_i32"),
        Err(FfiError::SignatureConflict { .. })
    ));

    assert_eq!(registry.declared_names(), vec!["add_i32", "missing"]);
}

#[test]
fn test_decode_return_widths() {
    use super::marshal::decode_return;

    assert_eq!(decode_return(0xFFFF_FFFF_0000_0001, FfiType::I32), FfiValue::Int(1));
    assert_eq!(decode_return(0x1_0000_0001, FfiType::Bool), FfiValue::Bool(true));
    assert_eq!(decode_return(0, FfiType::Ptr), FfiValue::Null);
    assert_eq!(decode_return(0, FfiType::CStr), FfiValue::Null);
    assert_eq!(decode_return(0x1000, FfiType::Ptr), FfiValue::Ptr(0x1000));
    assert_eq!(decode_return(u64::MAX, FfiType::I64), FfiValue::Int(-1));
}

#[test]
fn test_symbol_table_source() {
    let table = SymbolTable::new("t").with("a", 0x10);
    assert_eq!(table.len(), 1);
    let library = NativeLibrary::from_source(table);
    assert_eq!(library.lookup("a").unwrap(), 0x10);
    assert!(library.lookup("b").is_err());
    assert!(library.origin().contains("symbol table t"));
    assert!(library.same_as(&library.clone()));
}

#[cfg(target_os = "linux")]
#[test]
fn test_library_filename() {
    assert_eq!(loader::library_filename("llvmbind"), "libllvmbind.so");
    assert_eq!(loader::library_filename("libLLVM.so.18"), "libLLVM.so.18");
}

#[test]
fn test_locate_reports_searched_paths() {
    let mut loader = LibraryLoader::new();
    loader.add_search_path("/definitely/not/a/dir");
    match loader.locate("llvm_bind_no_such_library") {
        Err(FfiError::LibraryNotFound { name, searched }) => {
            assert_eq!(name, "llvm_bind_no_such_library");
            assert!(searched.contains(&std::path::PathBuf::from("/definitely/not/a/dir")));
        }
        other => panic!("unexpected result: {other:?}"),
    }

    // Sonames are left to the system loader
    assert!(loader.locate("libLLVM.so.18").is_ok());
}

#[cfg(target_os = "linux")]
#[test]
fn test_libc_loading() {
    // libc.so.6 is resolved by the system loader
    if let Ok(library) = LibraryLoader::new().open("libc.so.6") {
        let registry = SignatureRegistry::new();
        registry.declare("getpid", vec![], FfiType::I32).unwrap();

        let getpid = registry.resolve(&library, "getpid").unwrap();
        let out = unsafe { invoke(&getpid, &[]) }.unwrap();

        // Should match std::process::id()
        assert_eq!(out.ret.as_i64(), Some(std::process::id() as i64));
    }
}
