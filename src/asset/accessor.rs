//! Accessor binding checks
//!
//! The `gltf` readers slice buffers directly, so every accessor is checked
//! against its buffer view and buffer before any reader touches it. A failed
//! check aborts the load with [`ViewerError::AccessorOutOfRange`].

use gltf::accessor::{sparse::IndexType, DataType, Dimensions};

use crate::error::{Result, ViewerError};

/// Verifies offsets, strides and lengths of every accessor in the document
pub fn validate_all(document: &gltf::Document, buffers: &[Vec<u8>]) -> Result<()> {
    for view in document.views() {
        check_view(&view, buffers, None)?;
    }
    for accessor in document.accessors() {
        validate_range(&accessor, buffers)?;
    }
    Ok(())
}

/// Checks that an accessor's elements and sparse substitutions lie inside their views
pub fn validate_range(accessor: &gltf::Accessor, buffers: &[Vec<u8>]) -> Result<()> {
    let index = accessor.index();
    let element = accessor.size();
    let count = accessor.count();

    if let Some(view) = accessor.view() {
        check_view(&view, buffers, Some(index))?;

        let stride = view.stride().unwrap_or(element);
        if stride < element {
            return Err(ViewerError::accessor(
                index,
                format!("stride {} is smaller than element size {}", stride, element),
            ));
        }

        if count > 0 {
            let needed = accessor.offset() + stride * (count - 1) + element;
            if needed > view.length() {
                return Err(ViewerError::accessor(
                    index,
                    format!(
                        "{} elements need {} bytes but view {} holds {}",
                        count,
                        needed,
                        view.index(),
                        view.length()
                    ),
                ));
            }
        }

        let component = accessor.data_type().size();
        if (view.offset() + accessor.offset()) % component != 0 {
            return Err(ViewerError::accessor(
                index,
                format!("offset is not aligned to {}-byte components", component),
            ));
        }
    } else if accessor.sparse().is_none() && count > 0 {
        log::debug!("Accessor {} has no buffer view and reads as zeros", index);
    }

    if let Some(sparse) = accessor.sparse() {
        let substitutions = sparse.count();

        let indices = sparse.indices();
        let index_view = indices.view();
        check_view(&index_view, buffers, Some(index))?;
        let index_size = match indices.index_type() {
            IndexType::U8 => 1,
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        };
        if indices.offset() + substitutions * index_size > index_view.length() {
            return Err(ViewerError::accessor(index, "sparse indices overrun their view"));
        }

        let values = sparse.values();
        let value_view = values.view();
        check_view(&value_view, buffers, Some(index))?;
        if values.offset() + substitutions * element > value_view.length() {
            return Err(ViewerError::accessor(index, "sparse values overrun their view"));
        }
    }

    Ok(())
}

fn check_view(view: &gltf::buffer::View, buffers: &[Vec<u8>], accessor: Option<usize>) -> Result<()> {
    let buffer = view.buffer().index();
    let available = buffers.get(buffer).map(Vec::len).unwrap_or(0);
    let end = view.offset().checked_add(view.length());

    match end {
        Some(end) if end <= available => Ok(()),
        _ => Err(ViewerError::accessor(
            accessor.unwrap_or(usize::MAX),
            format!(
                "buffer view {} spans {}..{} of buffer {} ({} bytes)",
                view.index(),
                view.offset(),
                view.offset().saturating_add(view.length()),
                buffer,
                available
            ),
        )),
    }
}

/// Checks that an accessor has one of the allowed shapes and component types
pub fn expect_type(
    accessor: &gltf::Accessor,
    semantic: &str,
    dimensions: &[Dimensions],
    data_types: &[DataType],
) -> Result<()> {
    if !dimensions.contains(&accessor.dimensions()) {
        return Err(ViewerError::accessor(
            accessor.index(),
            format!("{} cannot be {:?}", semantic, accessor.dimensions()),
        ));
    }
    if !data_types.contains(&accessor.data_type()) {
        return Err(ViewerError::accessor(
            accessor.index(),
            format!("{} cannot use {:?} components", semantic, accessor.data_type()),
        ));
    }
    Ok(())
}

/// Checks a primitive's attribute and index accessors before reading them
pub fn validate_primitive(primitive: &gltf::Primitive) -> Result<()> {
    use gltf::Semantic;

    let vertex_count = primitive
        .get(&Semantic::Positions)
        .map(|a| a.count())
        .unwrap_or(0);

    for (semantic, accessor) in primitive.attributes() {
        match &semantic {
            Semantic::Positions | Semantic::Normals => {
                expect_type(&accessor, "POSITION/NORMAL", &[Dimensions::Vec3], &[DataType::F32])?
            }
            Semantic::Tangents => {
                expect_type(&accessor, "TANGENT", &[Dimensions::Vec4], &[DataType::F32])?
            }
            Semantic::TexCoords(_) => expect_type(
                &accessor,
                "TEXCOORD",
                &[Dimensions::Vec2],
                &[DataType::F32, DataType::U8, DataType::U16],
            )?,
            Semantic::Colors(_) => expect_type(
                &accessor,
                "COLOR",
                &[Dimensions::Vec3, Dimensions::Vec4],
                &[DataType::F32, DataType::U8, DataType::U16],
            )?,
            Semantic::Joints(_) => expect_type(
                &accessor,
                "JOINTS",
                &[Dimensions::Vec4],
                &[DataType::U8, DataType::U16],
            )?,
            Semantic::Weights(_) => expect_type(
                &accessor,
                "WEIGHTS",
                &[Dimensions::Vec4],
                &[DataType::F32, DataType::U8, DataType::U16],
            )?,
        }

        if accessor.count() != vertex_count {
            return Err(ViewerError::accessor(
                accessor.index(),
                format!(
                    "attribute has {} elements but POSITION has {}",
                    accessor.count(),
                    vertex_count
                ),
            ));
        }
    }

    if let Some(indices) = primitive.indices() {
        expect_type(
            &indices,
            "indices",
            &[Dimensions::Scalar],
            &[DataType::U8, DataType::U16, DataType::U32],
        )?;
    }

    for target in primitive.morph_targets() {
        for accessor in [target.positions(), target.normals(), target.tangents()]
            .into_iter()
            .flatten()
        {
            expect_type(&accessor, "morph target", &[Dimensions::Vec3], &[DataType::F32])?;
            if accessor.count() != vertex_count {
                return Err(ViewerError::accessor(
                    accessor.index(),
                    "morph target length differs from POSITION",
                ));
            }
        }
    }

    Ok(())
}
