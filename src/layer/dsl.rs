use crate::{
    layer::model::{
        CollectionBinding, ComponentInstance, FieldRef, Layer, LinkValue, MediaValue,
        PaginationSettings, RichTextNode, SortBy, SortOrder, SortSpec, SourceFieldType, TextValue,
    },
    pagination::controls::{PaginationRole, ROLE_ATTR, TARGET_LAYER_ATTR},
    visibility::condition::ConditionSet,
};

/// Fluent construction of stored layer trees.
pub struct LayerBuilder {
    layer: Layer,
}

impl LayerBuilder {
    /// Start a layer with no bindings.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            layer: Layer::new(id, name),
        }
    }

    /// Append one child.
    pub fn child(mut self, child: Layer) -> Self {
        self.layer.children.push(child);
        self
    }

    /// Append several children.
    pub fn children(mut self, children: impl IntoIterator<Item = Layer>) -> Self {
        self.layer.children.extend(children);
        self
    }

    /// Set an attribute.
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.layer.attributes.insert(key.into(), value.into());
        self
    }

    /// Literal text.
    pub fn text(mut self, content: impl Into<String>) -> Self {
        self.layer.variables.text = Some(TextValue::text(content));
        self
    }

    /// Plain text that may embed inline-variable tokens.
    pub fn dynamic_text(mut self, content: impl Into<String>) -> Self {
        self.layer.variables.text = Some(TextValue::DynamicText {
            content: content.into(),
        });
        self
    }

    /// Bind the text slot to a field.
    pub fn text_field(mut self, field: FieldRef) -> Self {
        self.layer.variables.text = Some(TextValue::DynamicField { field });
        self
    }

    /// Rich text with embedded variables.
    pub fn rich_text(mut self, nodes: Vec<RichTextNode>) -> Self {
        self.layer.variables.text = Some(TextValue::DynamicRichText { nodes });
        self
    }

    /// Bind the text slot to a variable of the enclosing component.
    pub fn component_text(mut self, variable_id: impl Into<String>) -> Self {
        self.layer.variables.text = Some(TextValue::ComponentVariable {
            variable_id: variable_id.into(),
        });
        self
    }

    /// Bind the image slot to a field.
    pub fn image_field(mut self, field: FieldRef) -> Self {
        self.layer.variables.image = Some(MediaValue::DynamicField { field });
        self
    }

    /// Bind the link slot to a field.
    pub fn link_field(mut self, field: FieldRef) -> Self {
        self.layer.variables.link = Some(LinkValue::DynamicField { field });
        self
    }

    /// Turn the layer into a list over a collection.
    pub fn collection(mut self, binding: CollectionBinding) -> Self {
        self.layer.variables.collection = Some(binding);
        self
    }

    /// Show the layer only when `set` holds.
    pub fn visible_when(mut self, set: ConditionSet) -> Self {
        self.layer.variables.conditional_visibility = Some(set);
        self
    }

    /// Mark the layer as an instance of `component_id`.
    pub fn component(mut self, component_id: impl Into<String>) -> Self {
        self.layer.component = Some(ComponentInstance {
            component_id: component_id.into(),
            overrides: Default::default(),
        });
        self
    }

    /// Override a component variable; a no-op unless [`Self::component`] was called first.
    pub fn override_text(mut self, variable_id: impl Into<String>, value: TextValue) -> Self {
        if let Some(c) = self.layer.component.as_mut() {
            c.overrides.insert(variable_id.into(), value);
        }
        self
    }

    /// Finish the layer.
    pub fn build(self) -> Layer {
        self.layer
    }
}

/// Collection binding builder entry point.
pub fn collection(collection_id: impl Into<String>) -> CollectionBinding {
    CollectionBinding::new(collection_id)
}

impl CollectionBinding {
    /// Sort by one field's value.
    pub fn sorted_by_field(mut self, field_id: impl Into<String>, order: SortOrder) -> Self {
        self.sort = SortSpec {
            by: SortBy::Field {
                field_id: field_id.into(),
            },
            order,
        };
        self
    }

    /// Shuffle on every resolution.
    pub fn shuffled(mut self) -> Self {
        self.sort = SortSpec {
            by: SortBy::Random,
            order: SortOrder::Asc,
        };
        self
    }

    /// Static window, ignored when paginated.
    pub fn limited(mut self, limit: usize, offset: usize) -> Self {
        self.limit = Some(limit);
        self.offset = offset;
        self
    }

    /// Enable pagination; `None` uses the engine's default page size.
    pub fn paginated(mut self, items_per_page: Option<usize>) -> Self {
        self.pagination = Some(PaginationSettings {
            enabled: true,
            items_per_page,
        });
        self
    }

    /// List only the items referenced by a field of the enclosing item.
    pub fn from_parent_field(
        mut self,
        field_id: impl Into<String>,
        field_type: SourceFieldType,
    ) -> Self {
        self.source_field_id = Some(field_id.into());
        self.source_field_type = Some(field_type);
        self
    }

    /// Keep only items whose own values satisfy `filters`.
    pub fn filtered(mut self, filters: ConditionSet) -> Self {
        self.filters = Some(filters);
        self
    }
}

/// Pagination control linked to the collection layer `layer_id`.
pub fn pagination_control(
    id: impl Into<String>,
    layer_id: impl Into<String>,
    role: PaginationRole,
) -> Layer {
    LayerBuilder::new(id, "button")
        .attr(TARGET_LAYER_ATTR, layer_id)
        .attr(ROLE_ATTR, role.as_str())
        .build()
}
