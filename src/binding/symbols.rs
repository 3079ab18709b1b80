//! Native entry points used by the wrappers, with their declared signatures.
//!
//! Owned strings (`LLVMPY_CreateString` results and `char **` messages) are
//! declared as `ptr` so the wrapper can hand them back to
//! [`DISPOSE_STRING`]; strings that stay owned by LLVM are declared `cstr`
//! and copied on return.
//!
//! [`INT_TYPE_IN_CONTEXT`] and [`STRUCT_TYPE_IN_CONTEXT`] are plain LLVM-C
//! functions rather than `LLVMPY_*` exports. They resolve only when the shim
//! is linked with the LLVM-C API symbols visible; otherwise the type
//! constructors in [`Context`](super::Context) fail with `UnknownSymbol`.

use crate::ffi::{FfiType::*, Result, SignatureRegistry};

// Initialization and version
pub const INITIALIZE: &str = "LLVMPY_Initialize";
pub const INITIALIZE_ALL_TARGET_INFOS: &str = "LLVMPY_InitializeAllTargetInfos";
pub const INITIALIZE_ALL_TARGETS: &str = "LLVMPY_InitializeAllTargets";
pub const INITIALIZE_ALL_TARGET_MCS: &str = "LLVMPY_InitializeAllTargetMCs";
pub const INITIALIZE_ALL_ASM_PRINTERS: &str = "LLVMPY_InitializeAllAsmPrinters";
pub const INITIALIZE_NATIVE_ASM_PARSER: &str = "LLVMPY_InitializeNativeAsmParser";
pub const INITIALIZE_NATIVE_ASM_PRINTER: &str = "LLVMPY_InitializeNativeAsmPrinter";
pub const GET_VERSION_INFO: &str = "LLVMPY_GetVersionInfo";
pub const DISPOSE_STRING: &str = "LLVMPY_DisposeString";

// Context
pub const GET_GLOBAL_CONTEXT: &str = "LLVMPY_GetGlobalContext";
pub const CONTEXT_CREATE: &str = "LLVMPY_ContextCreate";
pub const CONTEXT_DISPOSE: &str = "LLVMPY_ContextDispose";
pub const PARSE_ASSEMBLY: &str = "LLVMPY_ParseAssembly";
pub const INT_TYPE_IN_CONTEXT: &str = "LLVMIntTypeInContext";
pub const STRUCT_TYPE_IN_CONTEXT: &str = "LLVMStructTypeInContext";

// Module
pub const DISPOSE_MODULE: &str = "LLVMPY_DisposeModule";
pub const GET_MODULE_NAME: &str = "LLVMPY_GetModuleName";
pub const SET_MODULE_NAME: &str = "LLVMPY_SetModuleName";
pub const PRINT_MODULE_TO_STRING: &str = "LLVMPY_PrintModuleToString";
pub const GET_TARGET: &str = "LLVMPY_GetTarget";
pub const SET_TARGET: &str = "LLVMPY_SetTarget";
pub const GET_DATA_LAYOUT: &str = "LLVMPY_GetDataLayout";
pub const SET_DATA_LAYOUT: &str = "LLVMPY_SetDataLayout";
pub const VERIFY_MODULE: &str = "LLVMPY_VerifyModule";
pub const GET_NAMED_FUNCTION: &str = "LLVMPY_GetNamedFunction";
pub const GET_NAMED_GLOBAL_VARIABLE: &str = "LLVMPY_GetNamedGlobalVariable";
pub const CLONE_MODULE: &str = "LLVMPY_CloneModule";
pub const MODULE_FUNCTIONS_ITER: &str = "LLVMPY_ModuleFunctionsIter";
pub const FUNCTIONS_ITER_NEXT: &str = "LLVMPY_FunctionsIterNext";
pub const DISPOSE_FUNCTIONS_ITER: &str = "LLVMPY_DisposeFunctionsIter";
pub const MODULE_GLOBALS_ITER: &str = "LLVMPY_ModuleGlobalsIter";
pub const GLOBALS_ITER_NEXT: &str = "LLVMPY_GlobalsIterNext";
pub const DISPOSE_GLOBALS_ITER: &str = "LLVMPY_DisposeGlobalsIter";

// Types
pub const GET_TYPE_NAME: &str = "LLVMPY_GetTypeName";
pub const PRINT_TYPE: &str = "LLVMPY_PrintType";
pub const GET_TYPE_KIND: &str = "LLVMPY_GetTypeKind";
pub const TYPE_IS_POINTER: &str = "LLVMPY_TypeIsPointer";

// Values
pub const TYPE_OF: &str = "LLVMPY_TypeOf";
pub const TYPE_OF_MEMORY: &str = "LLVMPY_TypeOfMemory";
pub const GET_VALUE_NAME: &str = "LLVMPY_GetValueName";
pub const SET_VALUE_NAME: &str = "LLVMPY_SetValueName";
pub const GET_VALUE_KIND: &str = "LLVMPY_GetValueKind";
pub const PRINT_VALUE_TO_STRING: &str = "LLVMPY_PrintValueToString";
pub const GET_LINKAGE: &str = "LLVMPY_GetLinkage";
pub const SET_LINKAGE: &str = "LLVMPY_SetLinkage";
pub const GET_VISIBILITY: &str = "LLVMPY_GetVisibility";
pub const SET_VISIBILITY: &str = "LLVMPY_SetVisibility";
pub const GET_DLL_STORAGE_CLASS: &str = "LLVMPY_GetDLLStorageClass";
pub const SET_DLL_STORAGE_CLASS: &str = "LLVMPY_SetDLLStorageClass";
pub const IS_DECLARATION: &str = "LLVMPY_IsDeclaration";
pub const IS_CONSTANT: &str = "LLVMPY_IsConstant";
pub const GET_GLOBAL_PARENT: &str = "LLVMPY_GetGlobalParent";
pub const GET_OPCODE_NAME: &str = "LLVMPY_GetOpcodeName";
pub const GET_INITIALIZER: &str = "LLVMPY_GetInitializer";
pub const GET_CONSTANT_FP_VALUE: &str = "LLVMPY_GetConstantFPValue";
pub const GET_CONSTANT_INT_RAW_VALUE: &str = "LLVMPY_GetConstantIntRawValue";
pub const GET_CONSTANT_INT_NUM_WORDS: &str = "LLVMPY_GetConstantIntNumWords";
pub const GET_CONSTANT_DATA_AS_STRING: &str = "LLVMPY_GetConstantDataAsString";
pub const GET_CONSTANT_SEQUENCE_ELEMENT: &str = "LLVMPY_GetConstantSequenceElement";
pub const GET_CONSTANT_SEQUENCE_NUM_ELEMENTS: &str = "LLVMPY_GetConstantSequenceNumElements";
pub const CONSTANT_EXPR_AS_INSTRUCTION: &str = "LLVMPY_ConstantExprAsInstruction";
pub const WRITE_CFG: &str = "LLVMPY_WriteCFG";

// Value iterators
pub const FUNCTION_BLOCKS_ITER: &str = "LLVMPY_FunctionBlocksIter";
pub const BLOCKS_ITER_NEXT: &str = "LLVMPY_BlocksIterNext";
pub const DISPOSE_BLOCKS_ITER: &str = "LLVMPY_DisposeBlocksIter";
pub const FUNCTION_ARGUMENTS_ITER: &str = "LLVMPY_FunctionArgumentsIter";
pub const ARGUMENTS_ITER_NEXT: &str = "LLVMPY_ArgumentsIterNext";
pub const DISPOSE_ARGUMENTS_ITER: &str = "LLVMPY_DisposeArgumentsIter";
pub const BLOCK_INSTRUCTIONS_ITER: &str = "LLVMPY_BlockInstructionsIter";
pub const INSTRUCTIONS_ITER_NEXT: &str = "LLVMPY_InstructionsIterNext";
pub const DISPOSE_INSTRUCTIONS_ITER: &str = "LLVMPY_DisposeInstructionsIter";
pub const INSTRUCTION_OPERANDS_ITER: &str = "LLVMPY_InstructionOperandsIter";
pub const OPERANDS_ITER_NEXT: &str = "LLVMPY_OperandsIterNext";
pub const DISPOSE_OPERANDS_ITER: &str = "LLVMPY_DisposeOperandsIter";
pub const PHI_INCOMING_BLOCKS_ITER: &str = "LLVMPY_PhiIncomingBlocksIter";
pub const INCOMING_BLOCKS_ITER_NEXT: &str = "LLVMPY_IncomingBlocksIterNext";
pub const DISPOSE_INCOMING_BLOCKS_ITER: &str = "LLVMPY_DisposeIncomingBlocksIter";

// Targets
pub const GET_TRIPLE_OBJECT_FORMAT: &str = "LLVMPY_GetTripleObjectFormat";
pub const CREATE_TARGET_DATA: &str = "LLVMPY_CreateTargetData";
pub const COPY_STRING_REP_OF_TARGET_DATA: &str = "LLVMPY_CopyStringRepOfTargetData";
pub const DISPOSE_TARGET_DATA: &str = "LLVMPY_DisposeTargetData";
pub const ABI_SIZE_OF_TYPE: &str = "LLVMPY_ABISizeOfType";
pub const OFFSET_OF_ELEMENT: &str = "LLVMPY_OffsetOfElement";
pub const GET_TARGET_FROM_TRIPLE: &str = "LLVMPY_GetTargetFromTriple";
pub const GET_TARGET_NAME: &str = "LLVMPY_GetTargetName";
pub const GET_TARGET_DESCRIPTION: &str = "LLVMPY_GetTargetDescription";
pub const HAS_SVML_SUPPORT: &str = "LLVMPY_HasSVMLSupport";

/// Declare every catalog entry point in `registry`
pub fn declare_all(registry: &SignatureRegistry) -> Result<()> {
    for name in [
        INITIALIZE,
        INITIALIZE_ALL_TARGET_INFOS,
        INITIALIZE_ALL_TARGETS,
        INITIALIZE_ALL_TARGET_MCS,
        INITIALIZE_ALL_ASM_PRINTERS,
        INITIALIZE_NATIVE_ASM_PARSER,
        INITIALIZE_NATIVE_ASM_PRINTER,
    ] {
        registry.declare(name, vec![], Void)?;
    }
    registry.declare(GET_VERSION_INFO, vec![], U32)?;
    registry.declare(DISPOSE_STRING, vec![Ptr], Void)?;

    registry.declare(GET_GLOBAL_CONTEXT, vec![], Ptr)?;
    registry.declare(CONTEXT_CREATE, vec![], Ptr)?;
    registry.declare(CONTEXT_DISPOSE, vec![Ptr], Void)?;
    registry.declare(PARSE_ASSEMBLY, vec![Ptr, CStr, OutPtr], Ptr)?;
    registry.declare(INT_TYPE_IN_CONTEXT, vec![Ptr, U32], Ptr)?;
    registry.declare(STRUCT_TYPE_IN_CONTEXT, vec![Ptr, PtrArray, U32, I32], Ptr)?;

    registry.declare(DISPOSE_MODULE, vec![Ptr], Void)?;
    registry.declare(GET_MODULE_NAME, vec![Ptr], CStr)?;
    registry.declare(SET_MODULE_NAME, vec![Ptr, CStr], Void)?;
    registry.declare(PRINT_MODULE_TO_STRING, vec![Ptr, OutPtr], Void)?;
    registry.declare(GET_TARGET, vec![Ptr], CStr)?;
    registry.declare(SET_TARGET, vec![Ptr, CStr], Void)?;
    registry.declare(GET_DATA_LAYOUT, vec![Ptr, OutPtr], Void)?;
    registry.declare(SET_DATA_LAYOUT, vec![Ptr, CStr], Void)?;
    registry.declare(VERIFY_MODULE, vec![Ptr, OutPtr], I32)?;
    registry.declare(GET_NAMED_FUNCTION, vec![Ptr, CStr], Ptr)?;
    registry.declare(GET_NAMED_GLOBAL_VARIABLE, vec![Ptr, CStr], Ptr)?;
    registry.declare(CLONE_MODULE, vec![Ptr], Ptr)?;

    registry.declare(GET_TYPE_NAME, vec![Ptr], Ptr)?;
    registry.declare(PRINT_TYPE, vec![Ptr], Ptr)?;
    registry.declare(GET_TYPE_KIND, vec![Ptr], I32)?;
    registry.declare(TYPE_IS_POINTER, vec![Ptr], Bool)?;

    registry.declare(TYPE_OF, vec![Ptr], Ptr)?;
    registry.declare(TYPE_OF_MEMORY, vec![Ptr], Ptr)?;
    registry.declare(GET_VALUE_NAME, vec![Ptr], CStr)?;
    registry.declare(SET_VALUE_NAME, vec![Ptr, CStr], Void)?;
    registry.declare(GET_VALUE_KIND, vec![Ptr], I32)?;
    registry.declare(PRINT_VALUE_TO_STRING, vec![Ptr, OutPtr], Void)?;
    registry.declare(GET_LINKAGE, vec![Ptr], I32)?;
    registry.declare(SET_LINKAGE, vec![Ptr, I32], Void)?;
    registry.declare(GET_VISIBILITY, vec![Ptr], I32)?;
    registry.declare(SET_VISIBILITY, vec![Ptr, I32], Void)?;
    registry.declare(GET_DLL_STORAGE_CLASS, vec![Ptr], I32)?;
    registry.declare(SET_DLL_STORAGE_CLASS, vec![Ptr, I32], Void)?;
    registry.declare(IS_DECLARATION, vec![Ptr], I32)?;
    registry.declare(IS_CONSTANT, vec![Ptr], Bool)?;
    registry.declare(GET_GLOBAL_PARENT, vec![Ptr], Ptr)?;
    registry.declare(GET_OPCODE_NAME, vec![Ptr], Ptr)?;
    registry.declare(GET_INITIALIZER, vec![Ptr], Ptr)?;
    registry.declare(GET_CONSTANT_FP_VALUE, vec![Ptr, OutBool], F64)?;
    registry.declare(GET_CONSTANT_INT_RAW_VALUE, vec![Ptr, OutBool], Ptr)?;
    registry.declare(GET_CONSTANT_INT_NUM_WORDS, vec![Ptr], U32)?;
    registry.declare(GET_CONSTANT_DATA_AS_STRING, vec![Ptr], Ptr)?;
    registry.declare(GET_CONSTANT_SEQUENCE_ELEMENT, vec![Ptr, U32], Ptr)?;
    registry.declare(GET_CONSTANT_SEQUENCE_NUM_ELEMENTS, vec![Ptr], Usize)?;
    registry.declare(CONSTANT_EXPR_AS_INSTRUCTION, vec![Ptr], Ptr)?;
    registry.declare(WRITE_CFG, vec![Ptr, OutPtr, I32], Void)?;

    // Every iterator family has the same shape: create, next, dispose
    for (create, next, dispose) in [
        (MODULE_FUNCTIONS_ITER, FUNCTIONS_ITER_NEXT, DISPOSE_FUNCTIONS_ITER),
        (MODULE_GLOBALS_ITER, GLOBALS_ITER_NEXT, DISPOSE_GLOBALS_ITER),
        (FUNCTION_BLOCKS_ITER, BLOCKS_ITER_NEXT, DISPOSE_BLOCKS_ITER),
        (FUNCTION_ARGUMENTS_ITER, ARGUMENTS_ITER_NEXT, DISPOSE_ARGUMENTS_ITER),
        (BLOCK_INSTRUCTIONS_ITER, INSTRUCTIONS_ITER_NEXT, DISPOSE_INSTRUCTIONS_ITER),
        (INSTRUCTION_OPERANDS_ITER, OPERANDS_ITER_NEXT, DISPOSE_OPERANDS_ITER),
        (PHI_INCOMING_BLOCKS_ITER, INCOMING_BLOCKS_ITER_NEXT, DISPOSE_INCOMING_BLOCKS_ITER),
    ] {
        registry.declare(create, vec![Ptr], Ptr)?;
        registry.declare(next, vec![Ptr], Ptr)?;
        registry.declare(dispose, vec![Ptr], Void)?;
    }

    registry.declare(GET_TRIPLE_OBJECT_FORMAT, vec![CStr], I32)?;
    registry.declare(CREATE_TARGET_DATA, vec![CStr], Ptr)?;
    registry.declare(COPY_STRING_REP_OF_TARGET_DATA, vec![Ptr, OutPtr], Void)?;
    registry.declare(DISPOSE_TARGET_DATA, vec![Ptr], Void)?;
    registry.declare(ABI_SIZE_OF_TYPE, vec![Ptr, Ptr], I64)?;
    registry.declare(OFFSET_OF_ELEMENT, vec![Ptr, Ptr, I32], I64)?;
    registry.declare(GET_TARGET_FROM_TRIPLE, vec![CStr, OutPtr], Ptr)?;
    registry.declare(GET_TARGET_NAME, vec![Ptr], CStr)?;
    registry.declare(GET_TARGET_DESCRIPTION, vec![Ptr], CStr)?;
    registry.declare(HAS_SVML_SUPPORT, vec![], I32)?;

    Ok(())
}
